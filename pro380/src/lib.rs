//! pro380 - Rust client for the Inepro PRO380-Mod energy meter
//!
//! The meter speaks Modbus RTU, tunneled over a raw TCP socket by a serial
//! gateway. This library reads its registers and decodes them into typed
//! values.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `pro380-core`: Errors, typed values, register descriptors and the register catalog
//! - `pro380-transport`: Stream abstraction and TCP transport
//! - `pro380-session`: CRC-16, RTU frame codec and the request/response session
//! - `pro380-client`: Device client, polling records and discovery messages
//!
//! # Usage
//!
//! ```no_run
//! use pro380::client::DeviceBuilder;
//!
//! # async fn run() -> pro380::MeterResult<()> {
//! let mut device = DeviceBuilder::new().host("192.168.88.22").connect().await?;
//! println!("serial number: {}", device.query_named("serial_number").await?);
//! device.close().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use pro380_core::{catalog, DecodeKind, MeterError, MeterResult, RegisterDescriptor, Value};

// Re-export client API
pub mod client {
    pub use pro380_client::*;
}

// Re-export protocol layers
pub mod session {
    pub use pro380_session::*;
}

pub mod transport {
    pub use pro380_transport::*;
}
