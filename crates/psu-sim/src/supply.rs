//! Virtual programmable supply
//!
//! Tracks the same state a real instrument would (setpoints, output relay)
//! and answers the SCPI subset, so diagnostic collaborators that speak raw
//! commands cannot tell it from hardware. Readings come from the attached
//! [`LoadModel`]; with the output off every reading is exactly zero.

use psu_protocol::ScpiCommand;
use tracing::debug;

use crate::load::{LoadModel, LoadSample};

/// `*IDN?` reply reported by the simulated supply
pub const SIM_IDENTITY: &str = "SIMULATED,DC-PSU,0,1.0";

/// A simulated programmable DC power supply across a resistive load
#[derive(Debug, Clone)]
pub struct SimulatedSupply {
    voltage_setpoint: f64,
    current_setpoint: f64,
    output_enabled: bool,
    load: LoadModel,
}

impl Default for SimulatedSupply {
    fn default() -> Self {
        Self {
            voltage_setpoint: 0.0,
            current_setpoint: 0.0,
            output_enabled: false,
            load: LoadModel::new(),
        }
    }
}

impl SimulatedSupply {
    /// Create a supply with zeroed setpoints, output off, default load
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a supply across a specific load
    pub fn with_load(load: LoadModel) -> Self {
        Self {
            load,
            ..Self::default()
        }
    }

    /// Voltage setpoint in volts
    pub fn voltage_setpoint(&self) -> f64 {
        self.voltage_setpoint
    }

    /// Current limit setpoint in amps
    pub fn current_setpoint(&self) -> f64 {
        self.current_setpoint
    }

    /// Whether the simulated output relay is closed
    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    /// Set the voltage setpoint
    pub fn set_voltage(&mut self, volts: f64) {
        self.voltage_setpoint = volts;
    }

    /// Set the current limit setpoint
    pub fn set_current(&mut self, amps: f64) {
        self.current_setpoint = amps;
    }

    /// Open or close the simulated output relay
    pub fn set_output(&mut self, on: bool) {
        self.output_enabled = on;
    }

    /// Set the simulated load resistance (floored like the model)
    pub fn set_load_resistance(&mut self, resistance: f64) {
        self.load.set_resistance(resistance);
    }

    /// Current simulated load resistance
    pub fn load_resistance(&self) -> f64 {
        self.load.resistance()
    }

    /// Take one measurement; all-zero while the output is off
    pub fn measure(&self) -> LoadSample {
        if self.output_enabled {
            self.load.sample(self.voltage_setpoint, self.current_setpoint)
        } else {
            LoadSample::ZERO
        }
    }

    /// Measured terminal voltage
    pub fn read_voltage(&self) -> f64 {
        self.measure().voltage
    }

    /// Measured output current
    pub fn read_current(&self) -> f64 {
        self.measure().current
    }

    /// Measured output power
    pub fn read_power(&self) -> f64 {
        self.measure().power
    }

    /// Apply one parsed SCPI command, returning the reply line for queries
    ///
    /// Writes mutate state and return `None`. `*RST` restores the power-on
    /// state (setpoints zeroed, output off); the load itself is external to
    /// the instrument and survives a reset.
    pub fn apply_command(&mut self, cmd: &ScpiCommand) -> Option<String> {
        match cmd {
            ScpiCommand::Identify => Some(SIM_IDENTITY.to_string()),
            ScpiCommand::ClearStatus => None,
            ScpiCommand::Reset => {
                debug!("simulated supply reset");
                self.voltage_setpoint = 0.0;
                self.current_setpoint = 0.0;
                self.output_enabled = false;
                None
            }
            ScpiCommand::StatusByte | ScpiCommand::EventStatus => Some("0".to_string()),
            ScpiCommand::MeasureVoltage => Some(format!("{:.5}", self.read_voltage())),
            ScpiCommand::MeasureCurrent => Some(format!("{:.5}", self.read_current())),
            ScpiCommand::MeasurePower => Some(format!("{:.5}", self.read_power())),
            ScpiCommand::SetVoltage(v) => {
                self.voltage_setpoint = *v;
                None
            }
            ScpiCommand::SetCurrent(i) => {
                self.current_setpoint = *i;
                None
            }
            ScpiCommand::SetOutput(on) => {
                self.output_enabled = *on;
                None
            }
            ScpiCommand::OutputQuery => {
                Some(if self.output_enabled { "1" } else { "0" }.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_zero_while_output_off() {
        let mut psu = SimulatedSupply::new();
        psu.set_voltage(20.0);
        psu.set_current(1.0);
        assert_eq!(psu.read_voltage(), 0.0);
        assert_eq!(psu.read_current(), 0.0);
        assert_eq!(psu.read_power(), 0.0);
    }

    #[test]
    fn test_steady_state_readings() {
        let mut psu = SimulatedSupply::new();
        psu.set_voltage(20.0);
        psu.set_current(1.0);
        psu.set_output(true);
        assert!((psu.read_current() - 1.0).abs() < 1e-3);
        assert!((psu.read_voltage() - 10.0).abs() < 1e-3);
        assert!((psu.read_power() - 10.0).abs() < 2e-2);
    }

    #[test]
    fn test_setpoints_survive_output_toggle() {
        let mut psu = SimulatedSupply::new();
        psu.set_voltage(5.0);
        psu.set_current(2.0);
        psu.set_output(true);
        psu.set_output(false);
        assert_eq!(psu.voltage_setpoint(), 5.0);
        assert_eq!(psu.current_setpoint(), 2.0);
    }

    #[test]
    fn test_scpi_measure_queries() {
        let mut psu = SimulatedSupply::new();
        psu.apply_command(&ScpiCommand::SetVoltage(20.0));
        psu.apply_command(&ScpiCommand::SetCurrent(1.0));
        psu.apply_command(&ScpiCommand::SetOutput(true));

        let volt_reply = psu.apply_command(&ScpiCommand::MeasureVoltage).unwrap();
        let volts: f64 = volt_reply.parse().unwrap();
        assert!((volts - 10.0).abs() < 1e-2);

        assert_eq!(
            psu.apply_command(&ScpiCommand::OutputQuery).as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_scpi_identity() {
        let mut psu = SimulatedSupply::new();
        assert_eq!(
            psu.apply_command(&ScpiCommand::Identify).as_deref(),
            Some(SIM_IDENTITY)
        );
    }

    #[test]
    fn test_scpi_reset_restores_power_on_state() {
        let mut psu = SimulatedSupply::new();
        psu.set_load_resistance(22.0);
        psu.apply_command(&ScpiCommand::SetVoltage(12.0));
        psu.apply_command(&ScpiCommand::SetOutput(true));

        assert_eq!(psu.apply_command(&ScpiCommand::Reset), None);
        assert_eq!(psu.voltage_setpoint(), 0.0);
        assert!(!psu.output_enabled());
        // The external load is not part of the instrument
        assert_eq!(psu.load_resistance(), 22.0);
    }

    #[test]
    fn test_writes_return_no_reply() {
        let mut psu = SimulatedSupply::new();
        assert_eq!(psu.apply_command(&ScpiCommand::SetVoltage(1.0)), None);
        assert_eq!(psu.apply_command(&ScpiCommand::SetOutput(false)), None);
        assert_eq!(psu.apply_command(&ScpiCommand::ClearStatus), None);
    }
}
