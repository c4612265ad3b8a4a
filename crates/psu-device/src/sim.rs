//! Capability-contract adapter for the simulated supply
//!
//! `SimulatedSupply` itself is a plain synchronous model; this impl hangs
//! it on the same contract as the serial backend. A simulated link has
//! nothing to open or probe, so connectivity is trivially true, and raw
//! command passthrough routes through the SCPI parser so unsupported
//! commands fail exactly like they would on hardware.

use psu_protocol::{round_sig, ScpiCommand};
use psu_sim::{SimulatedSupply, SIM_IDENTITY};

use crate::config::ConnectionConfig;
use crate::error::DeviceError;
use crate::supply::PowerSupply;

impl PowerSupply for SimulatedSupply {
    async fn connect(&mut self, _config: &ConnectionConfig) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn disconnect(&mut self) {}

    async fn identify(&mut self) -> Result<String, DeviceError> {
        Ok(SIM_IDENTITY.to_string())
    }

    async fn is_connected(&mut self) -> bool {
        true
    }

    async fn read_voltage(&mut self) -> Result<f64, DeviceError> {
        Ok(round_sig(SimulatedSupply::read_voltage(self), 5))
    }

    async fn read_current(&mut self) -> Result<f64, DeviceError> {
        Ok(round_sig(SimulatedSupply::read_current(self), 5))
    }

    async fn read_power(&mut self) -> Result<f64, DeviceError> {
        Ok(round_sig(SimulatedSupply::read_power(self), 5))
    }

    async fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        SimulatedSupply::set_voltage(self, volts);
        Ok(())
    }

    async fn set_current(&mut self, amps: f64) -> Result<(), DeviceError> {
        SimulatedSupply::set_current(self, amps);
        Ok(())
    }

    async fn set_output(&mut self, on: bool) -> Result<(), DeviceError> {
        SimulatedSupply::set_output(self, on);
        Ok(())
    }

    async fn output_state(&mut self) -> Result<bool, DeviceError> {
        Ok(self.output_enabled())
    }

    async fn query(&mut self, cmd: &str) -> Result<String, DeviceError> {
        let parsed =
            ScpiCommand::parse(cmd).map_err(|e| DeviceError::Command(format!("`{cmd}`: {e}")))?;
        self.apply_command(&parsed)
            .ok_or_else(|| DeviceError::Command(format!("`{cmd}` produces no reply")))
    }

    async fn write(&mut self, cmd: &str) -> Result<(), DeviceError> {
        let parsed =
            ScpiCommand::parse(cmd).map_err(|e| DeviceError::Command(format!("`{cmd}`: {e}")))?;
        // Replies to queries sent as writes are discarded, like on the wire
        self.apply_command(&parsed);
        Ok(())
    }

    async fn clear(&mut self) -> Result<(), DeviceError> {
        self.apply_command(&ScpiCommand::ClearStatus);
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), DeviceError> {
        self.apply_command(&ScpiCommand::Reset);
        Ok(())
    }
}
