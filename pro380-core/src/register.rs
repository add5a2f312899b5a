//! Register descriptors and decoders

use crate::error::{MeterError, MeterResult};
use crate::value::Value;
use std::fmt;

/// Width of a single holding register in bytes
pub const REGISTER_WIDTH: u16 = 2;

/// Decoder applied to the payload of a register read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeKind {
    /// Unsigned big-endian integer, 1 to 8 bytes
    Integer,
    /// IEEE-754 big-endian single precision, exactly 4 bytes
    Float,
    /// Lowercase hex digits prefixed with `0x`
    HexString,
    /// Consecutive big-endian 4-byte floats
    FloatTuple,
}

impl DecodeKind {
    /// Check that this decoder accepts a payload of `len` bytes
    pub fn accepts(&self, len: usize) -> bool {
        match self {
            DecodeKind::Integer => (1..=8).contains(&len),
            DecodeKind::Float => len == 4,
            DecodeKind::HexString => len > 0,
            DecodeKind::FloatTuple => len > 0 && len % 4 == 0,
        }
    }

    /// Decode a payload into a typed value
    ///
    /// A width the decoder does not accept is a descriptor defect and is
    /// reported as [`MeterError::Decode`]; no partial value is produced.
    pub fn decode(&self, bytes: &[u8]) -> MeterResult<Value> {
        if !self.accepts(bytes.len()) {
            return Err(MeterError::Decode(format!(
                "{:?} decoder cannot consume {} bytes",
                self,
                bytes.len()
            )));
        }

        let value = match self {
            DecodeKind::Integer => Value::Integer(
                bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
            ),
            DecodeKind::Float => Value::Float(be_f32(bytes) as f64),
            DecodeKind::HexString => {
                let mut s = String::with_capacity(2 + bytes.len() * 2);
                s.push_str("0x");
                for b in bytes {
                    s.push_str(&format!("{:02x}", b));
                }
                Value::HexString(s)
            }
            DecodeKind::FloatTuple => Value::FloatTuple(
                bytes.chunks_exact(4).map(|chunk| be_f32(chunk) as f64).collect(),
            ),
        };
        Ok(value)
    }
}

fn be_f32(bytes: &[u8]) -> f32 {
    f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Register descriptor: where a value lives and how to decode it
///
/// `length` is the payload size in bytes; the register count requested on the
/// wire is `length / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    address: u16,
    length: u16,
    kind: DecodeKind,
}

impl RegisterDescriptor {
    /// Create a new register descriptor
    ///
    /// # Arguments
    ///
    /// * `address` - Start register address
    /// * `length` - Payload length in bytes (an even number)
    /// * `kind` - Decoder for the payload
    pub const fn new(address: u16, length: u16, kind: DecodeKind) -> Self {
        Self { address, length, kind }
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Payload length in bytes
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Number of 16-bit registers requested on the wire
    pub fn register_count(&self) -> u16 {
        self.length / REGISTER_WIDTH
    }

    pub fn kind(&self) -> DecodeKind {
        self.kind
    }

    /// Check the descriptor for internal consistency
    pub fn validate(&self) -> MeterResult<()> {
        if self.length == 0 || self.length % REGISTER_WIDTH != 0 {
            return Err(MeterError::Decode(format!(
                "register {:#06x}: length {} is not a whole number of registers",
                self.address, self.length
            )));
        }
        if !self.kind.accepts(self.length as usize) {
            return Err(MeterError::Decode(format!(
                "register {:#06x}: {:?} decoder cannot consume {} bytes",
                self.address, self.kind, self.length
            )));
        }
        Ok(())
    }

    /// Decode a payload read for this register
    pub fn decode(&self, payload: &[u8]) -> MeterResult<Value> {
        if payload.len() != self.length as usize {
            return Err(MeterError::Decode(format!(
                "register {:#06x}: expected {} bytes, got {}",
                self.address,
                self.length,
                payload.len()
            )));
        }
        self.kind.decode(payload)
    }
}

impl fmt::Display for RegisterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}/{}B/{:?}", self.address, self.length, self.kind)
    }
}
