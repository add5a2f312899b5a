//! TCP transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use pro380_core::{MeterError, MeterResult};
use std::fmt;
use std::io::ErrorKind;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default Modbus TCP port
pub const DEFAULT_PORT: u16 = 502;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

impl Deref for DebugTcpStream {
    type Target = TcpStream;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugTcpStream {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    /// Remote address as "host:port"; host names are resolved on open
    pub address: String,
    /// Applies to connection establishment and to every read and write
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout: Some(timeout),
        }
    }

    /// Create TCP settings from host and port
    pub fn from_host(host: &str, port: u16) -> Self {
        Self::new(format!("{}:{}", host, port))
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    closed: bool,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    /// Create TCP transport from address string
    pub fn from_address(address: &str) -> Self {
        Self::new(TcpSettings::new(address))
    }

    pub fn settings(&self) -> &TcpSettings {
        &self.settings
    }

    fn stream_mut(&mut self) -> MeterResult<&mut DebugTcpStream> {
        self.stream.as_mut().ok_or_else(|| {
            MeterError::transport(ErrorKind::NotConnected, "TCP stream not connected")
        })
    }
}

#[async_trait]
impl TransportLayer for TcpTransport {
    async fn open(&mut self) -> MeterResult<()> {
        if !self.closed {
            return Err(MeterError::Connection(std::io::Error::new(
                ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let address = self.settings.address.as_str();
        // A connect that does not finish in time never established anything
        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(address))
                .await
                .map_err(|_| {
                    MeterError::Connection(std::io::Error::new(
                        ErrorKind::TimedOut,
                        format!("Connecting to {} timed out", address),
                    ))
                })?
                .map_err(MeterError::Connection)?
        } else {
            TcpStream::connect(address)
                .await
                .map_err(MeterError::Connection)?
        };
        stream.set_nodelay(true).map_err(MeterError::Connection)?;

        log::debug!("Connected to {}", address);
        self.stream = Some(DebugTcpStream(stream));
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for TcpTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> MeterResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> MeterResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| MeterError::Timeout)?
                .map_err(MeterError::Transport)
        } else {
            stream.read(buf).await.map_err(MeterError::Transport)
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> MeterResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, stream.write(buf))
                .await
                .map_err(|_| MeterError::Timeout)?
                .map_err(MeterError::Transport)
        } else {
            stream.write(buf).await.map_err(MeterError::Transport)
        }
    }

    async fn flush(&mut self) -> MeterResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(MeterError::Transport)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> MeterResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            log::debug!("Closed connection to {}", self.settings.address);
        }
        self.closed = true;
        Ok(())
    }
}
