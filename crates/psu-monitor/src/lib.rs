//! Measurement Scheduler and Protection
//!
//! This crate drives the supply control core's periodic tick and owns the
//! latching OVP/OCP protection machine. Presentation layers never poll
//! the device; they register callbacks here:
//!
//! - **measurements** `(voltage, current, power)` every tick
//! - **protection trips**, once per latch
//! - **limit changes**, whenever OVP/OCP settings move
//! - **connection status**, once per edge
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use psu_device::{ConnectionConfig, DeviceSwitch, SerialSupply};
//! use psu_monitor::{Monitor, MonitorConfig, ProtectionConfig};
//! use psu_sim::SimulatedSupply;
//!
//! # async fn demo() {
//! let mut switch = DeviceSwitch::new(
//!     SerialSupply::new(ConnectionConfig::default()),
//!     SimulatedSupply::new(),
//! );
//! switch.enable_simulation(true);
//!
//! let mut monitor = Monitor::new(
//!     Arc::new(tokio::sync::Mutex::new(switch)),
//!     MonitorConfig::default(),
//!     ProtectionConfig::default(),
//! );
//! monitor.set_ovp(true, 30.0);
//! monitor.subscribe(|v, i, p| println!("{v:.3} V  {i:.3} A  {p:.3} W"));
//! monitor.start();
//! # monitor.stop().await;
//! # }
//! ```

pub mod monitor;
pub mod protection;
pub mod subscribers;

pub use monitor::{
    ConnectionCallback, LimitSetting, LimitsCallback, MeasurementCallback, Monitor, MonitorConfig,
    ProtectionCallback,
};
pub use protection::{Protection, ProtectionConfig, ProtectionState, TripReason};
pub use subscribers::SubscriptionId;
