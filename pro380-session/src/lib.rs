//! Session layer module for the PRO380 meter protocol
//!
//! This crate provides the Modbus RTU frame codec (CRC-16, read request
//! encoding, response validation) and the request/response session that runs
//! it over a transport.

pub mod crc;
pub mod rtu;
pub mod session;

pub use pro380_core::{MeterError, MeterResult};
pub use crc::{crc16, Crc16};
pub use rtu::{
    decode_response, decode_response_for, encode_request, response_len, EXCEPTION_FRAME_LENGTH,
    MAX_READ_REGISTERS, READ_HOLDING_REGISTERS,
};
pub use session::RtuSession;
