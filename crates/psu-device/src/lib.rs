//! Power Supply Device Abstraction
//!
//! This crate unifies a real serial instrument and a simulated load behind
//! one capability contract, so consumers of the measurement loop cannot
//! tell which one is active.
//!
//! # Architecture
//!
//! - [`PowerSupply`] is the capability trait: connect/identify/read/set
//!   operations with identical signatures across implementations
//! - [`SerialSupply`] speaks the SCPI line protocol over a serial port
//!   (or an in-memory stream for virtual instruments)
//! - [`psu_sim::SimulatedSupply`] gets its trait implementation here,
//!   keeping the simulation crate free of transport concerns
//! - [`DeviceSwitch`] holds both backends and forwards every call to
//!   whichever one the selector names; switching never touches the other
//!   backend's state
//!
//! # Example
//!
//! ```rust,no_run
//! use psu_device::{ConnectionConfig, DeviceSwitch, PowerSupply, SerialSupply};
//! use psu_sim::SimulatedSupply;
//!
//! # async fn demo() -> Result<(), psu_device::DeviceError> {
//! let config = ConnectionConfig::default();
//! let mut switch = DeviceSwitch::new(SerialSupply::new(config.clone()), SimulatedSupply::new());
//!
//! // Develop against the simulation, flip to hardware later
//! switch.enable_simulation(true);
//! switch.set_voltage(12.0).await?;
//! switch.set_output(true).await?;
//! let volts = switch.read_voltage().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod serial;
pub mod sim;
pub mod supply;
pub mod switch;
pub mod transport;

pub use config::{ConnectionConfig, DataBits, Parity, StopBits};
pub use error::DeviceError;
pub use serial::SerialSupply;
pub use supply::PowerSupply;
pub use switch::{BackendKind, DeviceSwitch};
pub use transport::Transport;
