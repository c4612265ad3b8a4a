//! SCPI command model
//!
//! Commands are modeled as a single enum covering the instrument subset.
//! `encode` produces the wire text without the line terminator; the
//! transport appends it. `parse` is the inverse and is used by simulated
//! instruments and test harnesses that stand in for hardware.

use crate::error::ParseError;

/// One SCPI command from the supported subset
#[derive(Debug, Clone, PartialEq)]
pub enum ScpiCommand {
    /// Identification query: `*IDN?`
    Identify,
    /// Clear status registers: `*CLS`
    ClearStatus,
    /// Instrument reset: `*RST`
    Reset,
    /// Status byte query: `*STB?`
    StatusByte,
    /// Event status register query: `*ESR?`
    EventStatus,
    /// Measured output voltage query: `MEAS:VOLT?`
    MeasureVoltage,
    /// Measured output current query: `MEAS:CURR?`
    MeasureCurrent,
    /// Measured output power query: `MEAS:POW?`
    MeasurePower,
    /// Voltage setpoint: `VOLT 12.5000`
    SetVoltage(f64),
    /// Current limit setpoint: `CURR 1.5000`
    SetCurrent(f64),
    /// Output relay control: `OUTP ON` / `OUTP OFF`
    SetOutput(bool),
    /// Output relay query: `OUTP?` (reply `1` or `0`)
    OutputQuery,
}

impl ScpiCommand {
    /// Encode to wire text, without the trailing newline.
    ///
    /// Setpoints are formatted fixed-point with 4 decimal places; the
    /// instrument rejects out-of-range values itself, so no clamping
    /// happens here.
    pub fn encode(&self) -> String {
        match self {
            ScpiCommand::Identify => "*IDN?".to_string(),
            ScpiCommand::ClearStatus => "*CLS".to_string(),
            ScpiCommand::Reset => "*RST".to_string(),
            ScpiCommand::StatusByte => "*STB?".to_string(),
            ScpiCommand::EventStatus => "*ESR?".to_string(),
            ScpiCommand::MeasureVoltage => "MEAS:VOLT?".to_string(),
            ScpiCommand::MeasureCurrent => "MEAS:CURR?".to_string(),
            ScpiCommand::MeasurePower => "MEAS:POW?".to_string(),
            ScpiCommand::SetVoltage(v) => format!("VOLT {:.4}", v),
            ScpiCommand::SetCurrent(i) => format!("CURR {:.4}", i),
            ScpiCommand::SetOutput(true) => "OUTP ON".to_string(),
            ScpiCommand::SetOutput(false) => "OUTP OFF".to_string(),
            ScpiCommand::OutputQuery => "OUTP?".to_string(),
        }
    }

    /// Whether this command produces a reply line
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            ScpiCommand::Identify
                | ScpiCommand::StatusByte
                | ScpiCommand::EventStatus
                | ScpiCommand::MeasureVoltage
                | ScpiCommand::MeasureCurrent
                | ScpiCommand::MeasurePower
                | ScpiCommand::OutputQuery
        )
    }

    /// Parse a command line (terminator already stripped)
    ///
    /// Mnemonics are matched case-insensitively; `OUTP` accepts `ON`/`OFF`
    /// as well as `1`/`0`, matching what real firmware tolerates.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (head, arg) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head.to_ascii_uppercase().as_str() {
            "*IDN?" => Ok(ScpiCommand::Identify),
            "*CLS" => Ok(ScpiCommand::ClearStatus),
            "*RST" => Ok(ScpiCommand::Reset),
            "*STB?" => Ok(ScpiCommand::StatusByte),
            "*ESR?" => Ok(ScpiCommand::EventStatus),
            "MEAS:VOLT?" => Ok(ScpiCommand::MeasureVoltage),
            "MEAS:CURR?" => Ok(ScpiCommand::MeasureCurrent),
            "MEAS:POW?" => Ok(ScpiCommand::MeasurePower),
            "OUTP?" => Ok(ScpiCommand::OutputQuery),
            "VOLT" => {
                let v = arg
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(arg.to_string()))?;
                Ok(ScpiCommand::SetVoltage(v))
            }
            "CURR" => {
                let i = arg
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(arg.to_string()))?;
                Ok(ScpiCommand::SetCurrent(i))
            }
            "OUTP" => match arg.to_ascii_uppercase().as_str() {
                "ON" | "1" => Ok(ScpiCommand::SetOutput(true)),
                "OFF" | "0" => Ok(ScpiCommand::SetOutput(false)),
                other => Err(ParseError::InvalidFlag(other.to_string())),
            },
            _ => Err(ParseError::UnknownCommand(line.to_string())),
        }
    }
}
