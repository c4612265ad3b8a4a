//! Serial instrument backend
//!
//! Speaks the SCPI line protocol over a serial port. Every exchange is
//! bounded by the configured transport timeout, so one wedged read cannot
//! starve the measurement loop indefinitely. The backend is generic over
//! its transport through [`Transport`]: hardware serial in production,
//! an in-memory duplex stream for virtual instruments.

use psu_protocol::{parse_flag, parse_float, round_sig, LineCodec, ScpiCommand, LINE_TERMINATOR};
use tokio::io::DuplexStream;
use tokio::time::Instant;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::DeviceError;
use crate::supply::PowerSupply;
use crate::transport::Transport;

fn not_connected() -> DeviceError {
    DeviceError::Connection("no transport open".into())
}

/// Real power supply behind a serial link
#[derive(Debug)]
pub struct SerialSupply {
    config: ConnectionConfig,
    link: Option<Transport>,
    codec: LineCodec,
}

impl SerialSupply {
    /// Create a backend holding `config`, not yet connected
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            link: None,
            codec: LineCodec::new(),
        }
    }

    /// The connection configuration this backend owns
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether a transport is currently open
    ///
    /// This only says a link exists; [`PowerSupply::is_connected`] is the
    /// liveness probe.
    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    /// Attach an in-memory transport in place of a serial port
    ///
    /// The other end of the duplex stream is expected to behave like an
    /// instrument: consume newline-terminated commands, reply to queries.
    pub fn connect_virtual(&mut self, stream: DuplexStream) {
        debug!("attaching virtual transport");
        self.link = Some(Transport::Virtual(stream));
        self.codec.clear();
    }

    /// Open the serial port described by the stored configuration
    async fn open_serial(&mut self) -> Result<(), DeviceError> {
        let parity = self.config.serial_parity()?;
        let stream = tokio_serial::new(&self.config.address, self.config.baud_rate)
            .parity(parity)
            .stop_bits(self.config.serial_stop_bits())
            .data_bits(self.config.serial_data_bits())
            .timeout(self.config.timeout())
            .open_native_async()
            .map_err(|e| {
                DeviceError::Connection(format!("could not open {}: {e}", self.config.address))
            })?;
        self.link = Some(Transport::Serial(stream));
        self.codec.clear();
        Ok(())
    }

    /// Send one command line, expecting no reply
    async fn send(&mut self, line: &str) -> Result<(), DeviceError> {
        let timeout = self.config.timeout();
        let link = self.link.as_mut().ok_or_else(not_connected)?;

        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(LINE_TERMINATOR);

        debug!("-> {line}");
        tokio::time::timeout(timeout, link.write_all(&framed))
            .await
            .map_err(|_| {
                DeviceError::Command(format!(
                    "`{line}` write timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| DeviceError::Command(format!("`{line}` write failed: {e}")))
    }

    /// Send one command line and wait for its reply line
    async fn exchange(&mut self, line: &str) -> Result<String, DeviceError> {
        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;

        self.send(line).await?;

        let link = self.link.as_mut().ok_or_else(not_connected)?;
        let mut buf = [0u8; 128];
        loop {
            if let Some(reply) = self.codec.next_line() {
                debug!("<- {reply}");
                return Ok(reply);
            }
            let n = tokio::time::timeout_at(deadline, link.read(&mut buf))
                .await
                .map_err(|_| {
                    DeviceError::Command(format!(
                        "`{line}` got no reply within {}ms",
                        timeout.as_millis()
                    ))
                })?
                .map_err(|e| DeviceError::Command(format!("`{line}` read failed: {e}")))?;
            if n == 0 {
                return Err(DeviceError::Command(format!("`{line}`: transport closed")));
            }
            self.codec.push_bytes(&buf[..n]);
        }
    }

    /// `*IDN?` round trip
    async fn probe(&mut self) -> Result<String, DeviceError> {
        self.exchange(&ScpiCommand::Identify.encode()).await
    }

    /// Fail with a `Connection` error unless the instrument responds
    async fn ensure_responsive(&mut self) -> Result<(), DeviceError> {
        if PowerSupply::is_connected(self).await {
            Ok(())
        } else {
            Err(DeviceError::Connection("instrument not responding".into()))
        }
    }

    /// Run one measurement query and normalize the reply
    async fn read_measurement(&mut self, cmd: ScpiCommand) -> Result<f64, DeviceError> {
        self.ensure_responsive().await?;
        let reply = self.exchange(&cmd.encode()).await?;
        let value =
            parse_float(&reply).map_err(|e| DeviceError::Command(format!("bad reply: {e}")))?;
        Ok(round_sig(value, 5))
    }
}

impl PowerSupply for SerialSupply {
    async fn connect(&mut self, config: &ConnectionConfig) -> Result<(), DeviceError> {
        config.validate()?;
        // Close-and-reopen; a live link is never reconfigured in place
        self.link = None;
        self.config = config.clone();
        self.open_serial().await?;
        info!(
            "connected to {} at {} baud",
            self.config.address, self.config.baud_rate
        );
        Ok(())
    }

    async fn disconnect(&mut self) {
        if self.link.take().is_some() {
            info!("disconnected from {}", self.config.address);
        }
        self.codec.clear();
    }

    async fn identify(&mut self) -> Result<String, DeviceError> {
        self.probe().await
    }

    async fn is_connected(&mut self) -> bool {
        if self.link.is_none() {
            return false;
        }
        match self.probe().await {
            Ok(_) => true,
            Err(e) => {
                debug!("liveness probe failed: {e}");
                false
            }
        }
    }

    async fn read_voltage(&mut self) -> Result<f64, DeviceError> {
        self.read_measurement(ScpiCommand::MeasureVoltage).await
    }

    async fn read_current(&mut self) -> Result<f64, DeviceError> {
        self.read_measurement(ScpiCommand::MeasureCurrent).await
    }

    async fn read_power(&mut self) -> Result<f64, DeviceError> {
        self.read_measurement(ScpiCommand::MeasurePower).await
    }

    async fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        self.ensure_responsive().await?;
        self.send(&ScpiCommand::SetVoltage(volts).encode()).await
    }

    async fn set_current(&mut self, amps: f64) -> Result<(), DeviceError> {
        self.ensure_responsive().await?;
        self.send(&ScpiCommand::SetCurrent(amps).encode()).await
    }

    async fn set_output(&mut self, on: bool) -> Result<(), DeviceError> {
        self.ensure_responsive().await?;
        self.send(&ScpiCommand::SetOutput(on).encode()).await
    }

    async fn output_state(&mut self) -> Result<bool, DeviceError> {
        self.ensure_responsive().await?;
        let reply = self.exchange(&ScpiCommand::OutputQuery.encode()).await?;
        parse_flag(&reply).map_err(|e| DeviceError::Command(format!("bad reply: {e}")))
    }

    async fn query(&mut self, cmd: &str) -> Result<String, DeviceError> {
        self.exchange(cmd).await
    }

    async fn write(&mut self, cmd: &str) -> Result<(), DeviceError> {
        self.send(cmd).await
    }

    async fn clear(&mut self) -> Result<(), DeviceError> {
        self.ensure_responsive().await?;
        self.send(&ScpiCommand::ClearStatus.encode()).await
    }

    async fn reset(&mut self) -> Result<(), DeviceError> {
        self.ensure_responsive().await?;
        self.send(&ScpiCommand::Reset.encode()).await
    }
}
