//! Typed register values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Most decimal places [`Value::rounded`] applies
pub const MAX_DECIMALS: u32 = 15;

/// Decoded value of a meter register
///
/// Serializes untagged, so a reading renders as plain JSON numbers, strings and
/// arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Unsigned big-endian integer
    Integer(u64),
    /// IEEE-754 single precision float, widened
    Float(f64),
    /// Raw bytes rendered as `0x` followed by lowercase hex digits
    HexString(String),
    /// Consecutive floats in payload order
    FloatTuple(Vec<f64>),
}

impl Value {
    /// Numeric view of scalar values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::HexString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Value::FloatTuple(v) => Some(v),
            _ => None,
        }
    }

    /// Round floating point content to `decimals` places
    ///
    /// Single precision values carry noise once widened (229.8 reads back as
    /// 229.8000030517578), so publishers round before serializing.
    ///
    /// Precision beyond what an `f64` carries leaves values unchanged.
    pub fn rounded(&self, decimals: u32) -> Value {
        let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
        let round = |v: f64| {
            let scaled = v * factor;
            if scaled.is_finite() { scaled.round() / factor } else { v }
        };
        match self {
            Value::Float(v) => Value::Float(round(*v)),
            Value::FloatTuple(values) => Value::FloatTuple(values.iter().map(|v| round(*v)).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::HexString(s) => write!(f, "{}", s),
            Value::FloatTuple(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}
