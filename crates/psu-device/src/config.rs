//! Serial connection configuration
//!
//! One record owns everything needed to (re)open the instrument link.
//! It is applied only through an explicit connect, which closes and
//! reopens the transport; nothing mutates a live link in place.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Parity setting for the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
    /// Mark parity (persisted for completeness; not all transports take it)
    Mark,
    /// Space parity (persisted for completeness; not all transports take it)
    Space,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    /// One stop bit
    #[default]
    One,
    /// Two stop bits
    Two,
}

impl From<StopBits> for u8 {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("stop bits must be 1 or 2, got {other}")),
        }
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    /// Seven data bits
    Seven,
    /// Eight data bits
    #[default]
    Eight,
}

impl From<DataBits> for u8 {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("data bits must be 7 or 8, got {other}")),
        }
    }
}

/// Serial link parameters for the real instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port path, e.g. `/dev/ttyUSB0` or `COM3`
    pub address: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Transport timeout in milliseconds; bounds every exchange
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    /// Parity setting
    pub parity: Parity,
    /// Stop bits
    pub stop_bits: StopBits,
    /// Data bits
    pub data_bits: DataBits,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "/dev/ttyUSB0".to_string(),
            baud_rate: 19200,
            timeout_ms: 5000,
            parity: Parity::None,
            stop_bits: StopBits::One,
            data_bits: DataBits::Eight,
        }
    }
}

impl ConnectionConfig {
    /// Transport timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the record before it touches a transport
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.address.trim().is_empty() {
            return Err(DeviceError::Config("address must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(DeviceError::Config("baud rate must be positive".into()));
        }
        if self.timeout_ms == 0 {
            return Err(DeviceError::Config("timeout must be positive".into()));
        }
        Ok(())
    }

    /// Map the parity setting onto the serial transport's enum
    ///
    /// Mark and space parity are valid in the persisted schema but have no
    /// counterpart in the transport layer.
    pub fn serial_parity(&self) -> Result<tokio_serial::Parity, DeviceError> {
        match self.parity {
            Parity::None => Ok(tokio_serial::Parity::None),
            Parity::Odd => Ok(tokio_serial::Parity::Odd),
            Parity::Even => Ok(tokio_serial::Parity::Even),
            Parity::Mark | Parity::Space => Err(DeviceError::Config(format!(
                "parity {:?} is not supported by the serial transport",
                self.parity
            ))),
        }
    }

    /// Stop bits as the serial transport's enum
    pub fn serial_stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }

    /// Data bits as the serial transport's enum
    pub fn serial_data_bits(&self) -> tokio_serial::DataBits {
        match self.data_bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_instrument_factory_settings() {
        let config = ConnectionConfig::default();
        assert_eq!(config.address, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ConnectionConfig::default();
        config.address = "  ".into();
        assert!(config.validate().unwrap_err().is_config());

        let mut config = ConnectionConfig::default();
        config.baud_rate = 0;
        assert!(config.validate().unwrap_err().is_config());

        let mut config = ConnectionConfig::default();
        config.timeout_ms = 0;
        assert!(config.validate().unwrap_err().is_config());

        assert!(ConnectionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_mark_parity_rejected_by_transport_mapping() {
        let mut config = ConnectionConfig::default();
        config.parity = Parity::Mark;
        assert!(config.serial_parity().unwrap_err().is_config());
        config.parity = Parity::Even;
        assert!(config.serial_parity().is_ok());
    }

    #[test]
    fn test_stop_and_data_bits_numeric_conversions() {
        assert_eq!(u8::from(StopBits::Two), 2);
        assert_eq!(StopBits::try_from(1).unwrap(), StopBits::One);
        assert!(StopBits::try_from(3).is_err());

        assert_eq!(u8::from(DataBits::Seven), 7);
        assert_eq!(DataBits::try_from(8).unwrap(), DataBits::Eight);
        assert!(DataBits::try_from(9).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn parity() -> impl Strategy<Value = Parity> {
            prop_oneof![
                Just(Parity::None),
                Just(Parity::Odd),
                Just(Parity::Even),
                Just(Parity::Mark),
                Just(Parity::Space),
            ]
        }

        proptest! {
            #[test]
            fn config_round_trips_through_json(
                baud in 1u32..1_000_000,
                timeout in 1u64..60_000,
                parity in parity(),
            ) {
                let config = ConnectionConfig {
                    baud_rate: baud,
                    timeout_ms: timeout,
                    parity,
                    ..ConnectionConfig::default()
                };
                let json = serde_json::to_string(&config).unwrap();
                let back: ConnectionConfig = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(back, config);
            }
        }
    }
}
