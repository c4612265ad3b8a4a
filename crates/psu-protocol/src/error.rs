//! Error types for SCPI parsing

use thiserror::Error;

/// Errors that can occur while parsing commands or replies
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Empty line where a command or value was expected
    #[error("empty line")]
    Empty,

    /// Command mnemonic outside the supported subset
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Argument or reply that should have been numeric
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    /// Boolean flag that was neither ON/OFF nor 1/0
    #[error("invalid flag: {0:?}")]
    InvalidFlag(String),
}
