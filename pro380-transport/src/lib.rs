//! Transport layer module for the PRO380 meter protocol
//!
//! This crate provides the stream abstraction used by the session layer and
//! its TCP implementation (Modbus RTU frames tunneled over a raw TCP socket).

pub mod stream;
pub mod tcp;

pub use pro380_core::{MeterError, MeterResult};
pub use stream::{StreamAccessor, TransportLayer};
pub use tcp::{TcpSettings, TcpTransport, DEFAULT_PORT};
