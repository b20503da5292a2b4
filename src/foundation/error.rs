/// Convenience result type used across fieldstamp.
pub type StampResult<T> = Result<T, StampError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum StampError {
    /// Invalid user-provided form data or batch shape, detected before any work.
    #[error("validation error: {0}")]
    Validation(String),

    /// A source photo could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors while rasterizing the composite or its overlay table.
    #[error("render error: {0}")]
    Render(String),

    /// The archive store rejected or failed a write.
    #[error("archive error: {0}")]
    Archive(String),

    /// Transport-level failure talking to the remote endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// The remote endpoint answered with a malformed or shape-mismatched body.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local history bookkeeping failed. Non-fatal by policy.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StampError {
    /// Build a [`StampError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StampError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`StampError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`StampError::Archive`] value.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Build a [`StampError::Network`] value.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Build a [`StampError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`StampError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
