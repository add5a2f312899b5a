//! PRO380 meter client implementation
//!
//! This crate composes the transport, the RTU session and the register
//! catalog into a single typed `query` operation, and provides the records a
//! polling/publishing loop builds from its results.

pub mod builder;
pub mod device;
pub mod discovery;
pub mod poller;

pub use builder::DeviceBuilder;
pub use device::{Device, MeterClient};
pub use discovery::{DeviceInfo, Entity, SensorConfig};
pub use poller::{Poller, Reading};
