//! Transport abstraction over the instrument link
//!
//! The serial backend reads and writes through this enum so a virtual
//! instrument on an in-memory duplex stream exercises exactly the same
//! code path as a hardware serial port.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio_serial::SerialStream;

/// The byte stream carrying SCPI lines to and from the instrument
pub enum Transport {
    /// A hardware serial port
    Serial(SerialStream),
    /// An in-memory stream, wired to a virtual instrument task
    Virtual(DuplexStream),
}

impl Transport {
    /// Write the whole buffer and flush
    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Transport::Serial(s) => {
                s.write_all(buf).await?;
                s.flush().await
            }
            Transport::Virtual(s) => {
                s.write_all(buf).await?;
                s.flush().await
            }
        }
    }

    /// Read whatever bytes are available
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Serial(s) => s.read(buf).await,
            Transport::Virtual(s) => s.read(buf).await,
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Serial(_) => f.write_str("Transport::Serial"),
            Transport::Virtual(_) => f.write_str("Transport::Virtual"),
        }
    }
}
