//! SCPI Protocol Library
//!
//! This crate provides encoding and parsing for the SCPI text-line command
//! subset spoken by programmable DC power supplies:
//!
//! - **IEEE 488.2 common commands**: `*IDN?`, `*CLS`, `*RST`, `*STB?`, `*ESR?`
//! - **Measurement queries**: `MEAS:VOLT?`, `MEAS:CURR?`, `MEAS:POW?`
//! - **Setpoint commands**: `VOLT <value>`, `CURR <value>` (fixed-point, 4 decimals)
//! - **Output control**: `OUTP ON|OFF`, `OUTP?`
//!
//! # Format
//!
//! - Commands: one ASCII line per exchange, newline-terminated
//! - Queries end in `?` and produce exactly one reply line
//! - Replies: bare numbers, `1`/`0` flags, or a comma-separated identity string
//!
//! # Example
//!
//! ```rust
//! use psu_protocol::{LineCodec, ScpiCommand};
//!
//! let cmd = ScpiCommand::SetVoltage(12.5);
//! assert_eq!(cmd.encode(), "VOLT 12.5000");
//!
//! // Parse a reply arriving in fragments
//! let mut codec = LineCodec::new();
//! codec.push_bytes(b"12.4");
//! assert!(codec.next_line().is_none());
//! codec.push_bytes(b"98\r\n");
//! assert_eq!(codec.next_line().as_deref(), Some("12.498"));
//! ```

pub mod codec;
pub mod command;
pub mod error;
pub mod response;

pub use codec::{LineCodec, LINE_TERMINATOR};
pub use command::ScpiCommand;
pub use error::ParseError;
pub use response::{parse_flag, parse_float, parse_register, round_sig};
