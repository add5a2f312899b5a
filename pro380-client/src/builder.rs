//! Device builder
//!
//! ```rust,no_run
//! use pro380_client::DeviceBuilder;
//!
//! # async fn run() -> pro380_core::MeterResult<()> {
//! let mut device = DeviceBuilder::new()
//!     .host("192.168.88.22")
//!     .unit_id(1)
//!     .connect()
//!     .await?;
//! let power = device.query_named("total_active_power").await?;
//! device.close().await?;
//! # Ok(())
//! # }
//! ```

use crate::device::Device;
use pro380_core::{MeterError, MeterResult};
use pro380_session::RtuSession;
use pro380_transport::{TcpSettings, TcpTransport, DEFAULT_PORT};
use std::time::Duration;

/// Builder for a TCP connected [`Device`]
///
/// # Default Settings
/// - Port: 502
/// - Unit id: 1
/// - Timeout: 30 seconds (connect and every read/write)
#[derive(Debug, Clone)]
pub struct DeviceBuilder {
    host: Option<String>,
    port: u16,
    unit_id: u8,
    timeout: Option<Duration>,
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            unit_id: 1,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Host name or IP address of the Modbus gateway
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Modbus unit id of the meter behind the gateway
    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Timeout for connecting and for each read/write; `None` waits forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Transport settings this builder would connect with
    pub fn settings(&self) -> MeterResult<TcpSettings> {
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| MeterError::InvalidRequest("Host not configured".to_string()))?;
        let mut settings = TcpSettings::from_host(host, self.port);
        settings.timeout = self.timeout;
        Ok(settings)
    }

    /// Open the connection and return the device
    pub async fn connect(self) -> MeterResult<Device<TcpTransport>> {
        let settings = self.settings()?;
        let mut session = RtuSession::new(TcpTransport::new(settings), self.unit_id);
        session.open().await?;
        Ok(Device::from_session(session))
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let settings = DeviceBuilder::new().host("192.168.88.22").settings().unwrap();
        assert_eq!(settings.address, "192.168.88.22:502");
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_overrides() {
        let settings = DeviceBuilder::new()
            .host("meter.local")
            .port(1502)
            .timeout(Some(Duration::from_millis(500)))
            .settings()
            .unwrap();
        assert_eq!(settings.address, "meter.local:1502");
        assert_eq!(settings.timeout, Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_builder_requires_host() {
        let result = DeviceBuilder::new().unit_id(3).connect().await;
        assert!(matches!(result, Err(MeterError::InvalidRequest(_))));
    }
}
