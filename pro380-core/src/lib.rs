//! Core types and utilities for the PRO380 meter protocol
//!
//! This crate provides the error taxonomy, the typed register values, the
//! register descriptors with their decoders and the static register catalog
//! used throughout the PRO380 implementation.

pub mod catalog;
pub mod error;
pub mod register;
pub mod value;

pub use error::{MeterError, MeterResult};
pub use register::{DecodeKind, RegisterDescriptor, REGISTER_WIDTH};
pub use value::{Value, MAX_DECIMALS};
