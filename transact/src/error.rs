//! Error types shared by the payment lifecycle and the RPC transport.
//!
//! Every fallible operation in the workspace returns [`TransactError`]. Each
//! variant wraps a dedicated struct so callers can match on the kind and
//! still reach the structured details (RPC code, HTTP status, shortfall).

use std::fmt;

use rust_decimal::Decimal;

/// Code reported when the node answers with a non-JSON content type.
pub const NON_JSON_RESPONSE: i64 = -342;

/// Code reported when a response envelope has neither `result` nor `error`.
pub const MISSING_RESULT: i64 = -343;

/// JSON-RPC "Parse error" code, used for batch responses shaped as a single object.
pub const PARSE_ERROR: i64 = -32700;

/// Base error type for payment and transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactError {
    /// The HTTP exchange with the node failed or returned something that is not JSON.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The node returned a structured JSON-RPC error.
    #[error("{0}")]
    Rpc(#[from] RpcError),

    /// The response envelope was well-formed JSON but not a valid JSON-RPC reply.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// Caller-supplied input or funds failed a precondition.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The operation is not permitted in the current state.
    #[error("{0}")]
    InvalidOperation(#[from] InvalidOperationError),
}

impl TransactError {
    /// Returns the numeric code carried by the error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Transport(e) => e.code,
            Self::Rpc(e) => Some(e.code),
            Self::Protocol(e) => Some(e.code),
            Self::Validation(_) | Self::InvalidOperation(_) => None,
        }
    }
}

/// Failure at the HTTP layer.
#[derive(Debug, Clone)]
pub struct TransportError {
    /// Error code, e.g. [`NON_JSON_RESPONSE`].
    pub code: Option<i64>,
    /// HTTP status code, when a response was received.
    pub status: Option<u16>,
    /// Human-readable reason.
    pub reason: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            reason: reason.into(),
        }
    }

    /// Builds the error raised for a response whose content type is not JSON.
    #[must_use]
    pub fn non_json(status: u16, status_reason: &str) -> Self {
        Self {
            code: Some(NON_JSON_RESPONSE),
            status: Some(status),
            reason: format!(
                "non-JSON HTTP response with '{status} {status_reason}' from server"
            ),
        }
    }

    /// Sets the error code.
    #[must_use]
    pub const fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "transport error {code}: {}", self.reason),
            None => write!(f, "transport error: {}", self.reason),
        }
    }
}

impl std::error::Error for TransportError {}

/// Structured error returned by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Error message from the node.
    pub message: String,
}

impl RpcError {
    /// Creates a new RPC error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Malformed JSON-RPC envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// Error code, e.g. [`MISSING_RESULT`] or [`PARSE_ERROR`].
    pub code: i64,
    /// Description of what was wrong with the envelope.
    pub message: String,
}

impl ProtocolError {
    /// Creates a new protocol error.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The envelope carried neither `result` nor `error`.
    #[must_use]
    pub fn missing_result() -> Self {
        Self::new(MISSING_RESULT, "missing JSON-RPC result")
    }

    /// A batch reply came back as a single object without an error.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProtocolError {}

/// A precondition on caller input or available funds was violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// What failed.
    pub reason: String,
    /// Missing funds, for insufficient-funds errors.
    pub shortfall: Option<Decimal>,
}

impl ValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            shortfall: None,
        }
    }

    /// Builds an insufficient-funds error for moving `amount` out of `available`.
    #[must_use]
    pub fn insufficient_funds(action: &str, amount: Decimal, available: Decimal) -> Self {
        let shortfall = amount - available;
        Self {
            reason: format!(
                "insufficient funds to {action} {amount} BTC: {available} BTC available, short by {shortfall} BTC"
            ),
            shortfall: Some(shortfall),
        }
    }

    /// Returns `true` when this error reports missing funds.
    #[must_use]
    pub const fn is_insufficient_funds(&self) -> bool {
        self.shortfall.is_some()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation error: {}", self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// The requested operation is not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOperationError {
    /// Why the operation was refused.
    pub reason: String,
}

impl InvalidOperationError {
    /// Creates a new invalid-operation error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for InvalidOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid operation: {}", self.reason)
    }
}

impl std::error::Error for InvalidOperationError {}
