//! The power supply capability contract
//!
//! Every backend implements this trait with identical semantics, and the
//! [`DeviceSwitch`](crate::switch::DeviceSwitch) implements it again by
//! forwarding, so the measurement loop and every other consumer dispatch
//! through one explicit interface rather than knowing which backend is
//! live.

use crate::config::ConnectionConfig;
use crate::error::DeviceError;

/// Capability interface of a programmable DC power supply
///
/// Contracts shared by all implementations:
///
/// - `connect` is an idempotent (re)open: safe to call on an already
///   connected backend, and the only way configuration reaches a transport
/// - `is_connected` is a liveness probe (a round-trip identification
///   query), never a cached flag
/// - `read_*` fail when the device is unreachable and return values
///   rounded to 5 significant digits
/// - setpoint setters transmit fixed-point values without client-side
///   range clamping; the instrument rejects out-of-range values and the
///   rejection surfaces as a `Command` error
#[allow(async_fn_in_trait)]
pub trait PowerSupply {
    /// Establish or re-establish the link described by `config`
    async fn connect(&mut self, config: &ConnectionConfig) -> Result<(), DeviceError>;

    /// Drop the link; subsequent operations fail until reconnected
    async fn disconnect(&mut self);

    /// Query the instrument identity (`*IDN?`)
    async fn identify(&mut self) -> Result<String, DeviceError>;

    /// Probe whether the instrument currently responds
    async fn is_connected(&mut self) -> bool;

    /// Measured output voltage in volts
    async fn read_voltage(&mut self) -> Result<f64, DeviceError>;

    /// Measured output current in amps
    async fn read_current(&mut self) -> Result<f64, DeviceError>;

    /// Measured output power in watts
    async fn read_power(&mut self) -> Result<f64, DeviceError>;

    /// Set the voltage setpoint
    async fn set_voltage(&mut self, volts: f64) -> Result<(), DeviceError>;

    /// Set the current limit setpoint
    async fn set_current(&mut self, amps: f64) -> Result<(), DeviceError>;

    /// Switch the output relay on or off
    async fn set_output(&mut self, on: bool) -> Result<(), DeviceError>;

    /// Query whether the output relay is on (`OUTP?`)
    async fn output_state(&mut self) -> Result<bool, DeviceError>;

    /// Raw command passthrough expecting one reply line
    async fn query(&mut self, cmd: &str) -> Result<String, DeviceError>;

    /// Raw command passthrough expecting no reply
    async fn write(&mut self, cmd: &str) -> Result<(), DeviceError>;

    /// Clear the instrument status registers (`*CLS`)
    async fn clear(&mut self) -> Result<(), DeviceError>;

    /// Reset the instrument (`*RST`)
    async fn reset(&mut self) -> Result<(), DeviceError>;
}
