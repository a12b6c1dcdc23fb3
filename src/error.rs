//! Error types for Modbus TCP coil transactions
//!
//! Every failure surfaces to the caller as a [`ModbusError`]. Nothing is
//! retried internally; the variant tells the caller what state the session
//! is in afterwards:
//!
//! | Variant | Session after the error |
//! |---------|-------------------------|
//! | `Connect` | never opened |
//! | `Timeout`, `Io` | closed, reconnect required |
//! | `Framing`, `Decode`, `Correlation` | open but suspect, close and reconnect advised |
//! | `Exception` | open and healthy, the device refused the request |
//! | `NotConnected` | no session |

use thiserror::Error;

use crate::protocol::ModbusException;

/// Result type used across the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Modbus client error
#[derive(Debug, Error)]
pub enum ModbusError {
    /// TCP connection could not be established
    #[error("Connection failed: {message}")]
    Connect { message: String },

    /// No complete response within the deadline
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Malformed MBAP header (short buffer, protocol id, length field)
    #[error("Framing error: {message}")]
    Framing { message: String },

    /// Malformed or unexpected PDU content
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Response transaction id differs from the request's
    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    Correlation { expected: u16, actual: u16 },

    /// The server answered with an exception PDU
    #[error("Modbus exception 0x{code:02X} on function 0x{function:02X}: {message}")]
    Exception {
        function: u8,
        code: u8,
        message: String,
    },

    /// Operation attempted without an open connection
    #[error("Not connected")]
    NotConnected,

    /// Raw I/O failure on the socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller supplied an out-of-range argument
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// A request could not be encoded
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Invalid client configuration or address
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ModbusError {
    pub fn connect<S: Into<String>>(message: S) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(operation: S, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn framing<S: Into<String>>(message: S) -> Self {
        Self::Framing {
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn correlation(expected: u16, actual: u16) -> Self {
        Self::Correlation { expected, actual }
    }

    /// Build an exception error from the raw function and exception codes.
    ///
    /// `function` may be given with or without the 0x80 exception bit.
    pub fn exception(function: u8, code: u8) -> Self {
        let message = ModbusException::from_u8(code)
            .map(|e| e.description().to_string())
            .unwrap_or_else(|| "Unknown exception".to_string());
        Self::Exception {
            function: function & 0x7F,
            code,
            message,
        }
    }

    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True when the device explicitly rejected the request.
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// Exception code carried by an `Exception` error.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            Self::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the session can no longer be trusted and the caller must
    /// close and reconnect before issuing another request.
    ///
    /// A timed-out write may still have been executed by the device.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Io(_)
                | Self::Framing { .. }
                | Self::Decode { .. }
                | Self::Correlation { .. }
                | Self::NotConnected
        )
    }

    /// True for errors that tear the transport down immediately.
    pub(crate) fn is_fatal_io(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_message() {
        let err = ModbusError::exception(0x85, 0x02);
        assert_eq!(err.exception_code(), Some(0x02));
        assert!(err.is_exception());
        assert!(!err.requires_reconnect());
        match err {
            ModbusError::Exception { function, .. } => assert_eq!(function, 0x05),
            _ => panic!("expected exception"),
        }
    }

    #[test]
    fn test_unknown_exception_code() {
        let err = ModbusError::exception(0x01, 0x7E);
        assert!(err.to_string().contains("Unknown exception"));
    }

    #[test]
    fn test_reconnect_classification() {
        assert!(ModbusError::timeout("read response", 2000).requires_reconnect());
        assert!(ModbusError::correlation(1, 2).requires_reconnect());
        assert!(ModbusError::framing("short").requires_reconnect());
        assert!(!ModbusError::invalid_data("quantity").requires_reconnect());
        assert!(ModbusError::timeout("send", 1).is_fatal_io());
        assert!(!ModbusError::correlation(1, 2).is_fatal_io());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: ModbusError = io.into();
        assert!(matches!(err, ModbusError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
