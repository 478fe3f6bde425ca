//! Error types for reader connection operations.

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;

/// Errors that can occur while managing a reader connection.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// Error from the inventory engine.
    #[error(transparent)]
    Inventory(#[from] grokker_core::Error),

    /// The operation needs a reader that has completed a handshake.
    #[error("Reader not connected: cannot {operation}")]
    Disconnected { operation: String },

    /// An internal channel was closed by the other side.
    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: String },

    /// A background task panicked or was cancelled.
    #[error("Task failed: {message}")]
    TaskFailed { message: String },
}

impl ReaderError {
    /// Create a new disconnected error.
    pub fn disconnected(operation: impl Into<String>) -> Self {
        Self::Disconnected {
            operation: operation.into(),
        }
    }

    /// Create a new channel closed error.
    pub fn channel_closed(channel: impl Into<String>) -> Self {
        Self::ChannelClosed {
            channel: channel.into(),
        }
    }

    /// Create a new task failed error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }

    /// Returns the wrapped engine error, if any.
    pub fn as_inventory(&self) -> Option<&grokker_core::Error> {
        match self {
            Self::Inventory(error) => Some(error),
            _ => None,
        }
    }
}
