//! Backend switch
//!
//! Holds both backends as concrete instances and forwards every
//! capability call to whichever one the selector names. Switching is a
//! selector flip and nothing else: it never connects, disconnects, or
//! clears setpoints on either side, so flipping to the simulation and
//! back leaves the real link and its configuration untouched.

use psu_sim::SimulatedSupply;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConnectionConfig;
use crate::error::DeviceError;
use crate::serial::SerialSupply;
use crate::supply::PowerSupply;

/// Which backend receives forwarded calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Hardware instrument over the serial link
    #[default]
    Real,
    /// Simulated supply across a resistive load
    Simulated,
}

/// The one device handle the rest of the system talks to
#[derive(Debug)]
pub struct DeviceSwitch {
    real: SerialSupply,
    sim: SimulatedSupply,
    active: BackendKind,
}

impl DeviceSwitch {
    /// Create a switch over the two backends; the real one starts active
    pub fn new(real: SerialSupply, sim: SimulatedSupply) -> Self {
        Self {
            real,
            sim,
            active: BackendKind::Real,
        }
    }

    /// Select the simulated or real backend
    ///
    /// Only the selector changes; both backends keep their state.
    pub fn enable_simulation(&mut self, enable: bool) {
        let target = if enable {
            BackendKind::Simulated
        } else {
            BackendKind::Real
        };
        if self.active != target {
            info!("switching active backend to {:?}", target);
            self.active = target;
        }
    }

    /// Whether the simulated backend is active
    pub fn simulation_enabled(&self) -> bool {
        self.active == BackendKind::Simulated
    }

    /// The currently selected backend
    pub fn active_backend(&self) -> BackendKind {
        self.active
    }

    /// Set the simulated load resistance (reaches the simulation no matter
    /// which backend is active, like turning the physical load's knob)
    pub fn set_load_resistance(&mut self, resistance: f64) {
        self.sim.set_load_resistance(resistance);
    }

    /// Current simulated load resistance
    pub fn load_resistance(&self) -> f64 {
        self.sim.load_resistance()
    }

    /// The real backend's connection configuration
    pub fn connection_config(&self) -> &ConnectionConfig {
        self.real.config()
    }
}

impl PowerSupply for DeviceSwitch {
    async fn connect(&mut self, config: &ConnectionConfig) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.connect(config).await,
            BackendKind::Simulated => self.sim.connect(config).await,
        }
    }

    async fn disconnect(&mut self) {
        match self.active {
            BackendKind::Real => self.real.disconnect().await,
            BackendKind::Simulated => PowerSupply::disconnect(&mut self.sim).await,
        }
    }

    async fn identify(&mut self) -> Result<String, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.identify().await,
            BackendKind::Simulated => PowerSupply::identify(&mut self.sim).await,
        }
    }

    async fn is_connected(&mut self) -> bool {
        match self.active {
            BackendKind::Real => PowerSupply::is_connected(&mut self.real).await,
            BackendKind::Simulated => PowerSupply::is_connected(&mut self.sim).await,
        }
    }

    async fn read_voltage(&mut self) -> Result<f64, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.read_voltage().await,
            BackendKind::Simulated => PowerSupply::read_voltage(&mut self.sim).await,
        }
    }

    async fn read_current(&mut self) -> Result<f64, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.read_current().await,
            BackendKind::Simulated => PowerSupply::read_current(&mut self.sim).await,
        }
    }

    async fn read_power(&mut self) -> Result<f64, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.read_power().await,
            BackendKind::Simulated => PowerSupply::read_power(&mut self.sim).await,
        }
    }

    async fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.set_voltage(volts).await,
            BackendKind::Simulated => PowerSupply::set_voltage(&mut self.sim, volts).await,
        }
    }

    async fn set_current(&mut self, amps: f64) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.set_current(amps).await,
            BackendKind::Simulated => PowerSupply::set_current(&mut self.sim, amps).await,
        }
    }

    async fn set_output(&mut self, on: bool) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.set_output(on).await,
            BackendKind::Simulated => PowerSupply::set_output(&mut self.sim, on).await,
        }
    }

    async fn output_state(&mut self) -> Result<bool, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.output_state().await,
            BackendKind::Simulated => PowerSupply::output_state(&mut self.sim).await,
        }
    }

    async fn query(&mut self, cmd: &str) -> Result<String, DeviceError> {
        match self.active {
            BackendKind::Real => self.real.query(cmd).await,
            BackendKind::Simulated => PowerSupply::query(&mut self.sim, cmd).await,
        }
    }

    async fn write(&mut self, cmd: &str) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.write(cmd).await,
            BackendKind::Simulated => PowerSupply::write(&mut self.sim, cmd).await,
        }
    }

    async fn clear(&mut self) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.clear().await,
            BackendKind::Simulated => PowerSupply::clear(&mut self.sim).await,
        }
    }

    async fn reset(&mut self) -> Result<(), DeviceError> {
        match self.active {
            BackendKind::Real => self.real.reset().await,
            BackendKind::Simulated => PowerSupply::reset(&mut self.sim).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch() -> DeviceSwitch {
        DeviceSwitch::new(
            SerialSupply::new(ConnectionConfig::default()),
            SimulatedSupply::new(),
        )
    }

    #[test]
    fn test_real_backend_active_by_default() {
        let sw = switch();
        assert_eq!(sw.active_backend(), BackendKind::Real);
        assert!(!sw.simulation_enabled());
    }

    #[tokio::test]
    async fn test_forwarding_follows_selector() {
        let mut sw = switch();

        // Real side has no link: reads fail with a connection error
        assert!(!sw.is_connected().await);
        assert!(sw.read_voltage().await.unwrap_err().is_connection());

        sw.enable_simulation(true);
        assert!(sw.is_connected().await);
        sw.set_voltage(20.0).await.unwrap();
        sw.set_current(1.0).await.unwrap();
        sw.set_output(true).await.unwrap();
        let volts = sw.read_voltage().await.unwrap();
        assert!((volts - 10.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_switching_preserves_sim_setpoints() {
        let mut sw = switch();
        sw.enable_simulation(true);
        sw.set_voltage(12.0).await.unwrap();
        sw.set_output(true).await.unwrap();

        sw.enable_simulation(false);
        sw.enable_simulation(true);

        // Setpoints applied before the round trip are still in force
        assert!(sw.output_state().await.unwrap());
        sw.set_current(5.0).await.unwrap();
        let volts = sw.read_voltage().await.unwrap();
        assert!((volts - 12.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_switching_preserves_real_connection_config() {
        let mut config = ConnectionConfig::default();
        config.address = "/dev/ttyS7".into();
        config.baud_rate = 115200;
        config.timeout_ms = 250;
        let mut sw = DeviceSwitch::new(SerialSupply::new(config.clone()), SimulatedSupply::new());

        sw.enable_simulation(true);
        sw.set_voltage(3.3).await.unwrap();
        sw.enable_simulation(false);

        assert_eq!(*sw.connection_config(), config);
    }

    #[tokio::test]
    async fn test_load_resistance_reaches_sim_regardless_of_selector() {
        let mut sw = switch();
        // Real backend active, knob still turns the simulated load
        sw.set_load_resistance(22.0);
        assert_eq!(sw.load_resistance(), 22.0);

        sw.enable_simulation(true);
        sw.set_load_resistance(0.0);
        assert_eq!(sw.load_resistance(), psu_sim::MIN_RESISTANCE);
    }

    #[tokio::test]
    async fn test_raw_passthrough_follows_selector() {
        let mut sw = switch();
        sw.enable_simulation(true);
        assert_eq!(sw.query("*IDN?").await.unwrap(), psu_sim::SIM_IDENTITY);

        sw.enable_simulation(false);
        assert!(sw.query("*IDN?").await.unwrap_err().is_connection());
    }
}
