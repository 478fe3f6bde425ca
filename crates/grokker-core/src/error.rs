//! Error types for the inventory engine.
//!
//! Every error is local to the call that produced it. A rejected session
//! start leaves no session behind, a rejected read leaves the session
//! untouched, and an operation on a stopped session mutates nothing.

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the inventory engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Conflicting or invalid session configuration or EPC filter.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Malformed tag identifier.
    #[error("Invalid EPC: {message}")]
    InvalidEpc { message: String },

    /// Operation attempted on a stopped or not-yet-started session.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl Error {
    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new invalid EPC error.
    pub fn invalid_epc(message: impl Into<String>) -> Self {
        Self::InvalidEpc {
            message: message.into(),
        }
    }

    /// Create a new invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Returns `true` if this error only dropped a single read.
    pub fn is_dropped_read(&self) -> bool {
        matches!(self, Self::InvalidEpc { .. })
    }
}
