//! Power Supply Simulation Library
//!
//! This crate provides a simulation layer for exercising the supply control
//! core without physical hardware. It includes:
//!
//! - **LoadModel**: a resistive load (Ohm's law with current limiting and
//!   measurement noise)
//! - **SimulatedSupply**: a virtual programmable supply that tracks
//!   setpoints and output state and answers the SCPI command subset
//!
//! # Example
//!
//! ```rust
//! use psu_sim::SimulatedSupply;
//!
//! let mut psu = SimulatedSupply::new();
//! psu.set_voltage(20.0);
//! psu.set_current(1.0);
//! psu.set_output(true);
//!
//! // 10 Ω default load limits the current: I = min(20/10, 1.0) = 1.0 A
//! let sample = psu.measure();
//! assert!((sample.current - 1.0).abs() < 1e-3);
//! assert!((sample.voltage - 10.0).abs() < 1e-3);
//! ```

pub mod load;
pub mod supply;

pub use load::{LoadModel, LoadSample, DEFAULT_RESISTANCE, MIN_RESISTANCE};
pub use supply::{SimulatedSupply, SIM_IDENTITY};
