//! Stream accessor trait for transport layer

use async_trait::async_trait;
use pro380_core::{MeterError, MeterResult};
use std::io::ErrorKind;
use std::time::Duration;

/// Stream accessor interface to access a physical stream to a remote meter
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read/write timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - The timeout duration. None means infinite timeout.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> MeterResult<()>;

    /// Read data from the stream
    ///
    /// # Returns
    ///
    /// Number of bytes read, or 0 if EOF
    async fn read(&mut self, buf: &mut [u8]) -> MeterResult<usize>;

    /// Read exact number of bytes from the stream
    ///
    /// The remote side may deliver a frame in any number of fragments; this
    /// keeps reading until `buf` is full. End of stream before that is an
    /// error, never a truncated buffer.
    async fn read_exact(&mut self, mut buf: &mut [u8]) -> MeterResult<()> {
        while !buf.is_empty() {
            let n = self.read(buf).await?;
            if n == 0 {
                return Err(MeterError::transport(
                    ErrorKind::UnexpectedEof,
                    "Failed to read exact number of bytes",
                ));
            }
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Write data to the stream
    ///
    /// # Returns
    ///
    /// Number of bytes written
    async fn write(&mut self, buf: &[u8]) -> MeterResult<usize>;

    /// Write all data to the stream
    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(MeterError::transport(
                    ErrorKind::WriteZero,
                    "Failed to write all data",
                ));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data
    async fn flush(&mut self) -> MeterResult<()>;

    /// Check if the stream is closed
    fn is_closed(&self) -> bool;

    /// Close the stream. Closing twice is a no-op.
    async fn close(&mut self) -> MeterResult<()>;
}

/// Transport layer trait that extends StreamAccessor
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical layer connection
    async fn open(&mut self) -> MeterResult<()>;
}
