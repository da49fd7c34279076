//! Error types for broker connections.

/// Errors that can occur on a broker channel.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The underlying connection failed.
    #[error("broker connection error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent a frame that violates the wire contract.
    #[error("broker protocol error: expected {expected}, got '{got}'")]
    Protocol {
        /// What the contract called for.
        expected: String,
        /// The frame actually received.
        got: String,
    },

    /// The connection closed while a reply was still expected.
    #[error("broker connection closed")]
    Closed,
}
