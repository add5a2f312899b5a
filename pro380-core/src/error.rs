use thiserror::Error;

/// Main error type for PRO380 meter operations
#[derive(Error, Debug)]
pub enum MeterError {
    /// The transport could not be established
    #[error("Connection error: {0}")]
    Connection(#[source] std::io::Error),

    /// I/O failure on an established stream, or the session is unusable
    #[error("Transport error: {0}")]
    Transport(#[source] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Framing error: expected {expected} bytes, got {actual}")]
    Framing { expected: usize, actual: usize },

    #[error("CRC mismatch: expected {expected:#06x}, received {received:#06x}")]
    Checksum { expected: u16, received: u16 },

    /// A reply from another unit or for another function
    #[error("Unexpected reply: unit id {unit_id:#04x}, function code {function:#04x}")]
    UnexpectedReply { unit_id: u8, function: u8 },

    #[error("Modbus exception: function code {function:#04x}, exception code {code:#04x}")]
    Exception { function: u8, code: u8 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown register: {0}")]
    UnknownRegister(String),
}

impl MeterError {
    /// Build a transport error from an I/O error kind and message
    pub fn transport(kind: std::io::ErrorKind, message: &str) -> Self {
        MeterError::Transport(std::io::Error::new(kind, message.to_string()))
    }

    /// Whether the session that produced this error has to be closed and reopened
    /// before it can be used again.
    pub fn requires_reopen(&self) -> bool {
        matches!(
            self,
            MeterError::Connection(_)
                | MeterError::Transport(_)
                | MeterError::Timeout
                | MeterError::Framing { .. }
                | MeterError::Checksum { .. }
                | MeterError::UnexpectedReply { .. }
        )
    }
}

/// Result type alias for PRO380 meter operations
pub type MeterResult<T> = Result<T, MeterError>;
