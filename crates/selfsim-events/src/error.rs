//! Errors reported by message handlers.

/// A subscriber failed to handle a delivered message.
///
/// Handler failures are isolated: the post office logs them, counts them,
/// and converts them into an `ERROR` message for the next round.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The handler refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// A payload field the handler needs is absent or has the wrong type.
    #[error("payload field `{key}` is missing or malformed")]
    Payload {
        /// The payload key that could not be read.
        key: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Shorthand for [`HandlerError::Payload`].
    pub fn payload(key: impl Into<String>) -> Self {
        Self::Payload { key: key.into() }
    }
}
