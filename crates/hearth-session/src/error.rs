//! Error types for session provider operations.

/// Error type for session provider operations.
///
/// Store operations themselves never fail; these errors only surface while
/// configuring or constructing a provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The supplied configuration names a different provider.
    #[error("Provider config mismatch: expected '{expected}', got '{found}'")]
    ConfigMismatch { expected: String, found: String },

    /// The provider options could not be decoded into the provider's config type.
    #[error("Invalid options for provider '{provider}': {reason}")]
    InvalidOptions { provider: String, reason: String },

    /// No factory is registered under the requested provider name.
    #[error("Unknown session provider: {0}")]
    UnknownProvider(String),
}

/// Result type for session provider operations.
pub type Result<T> = std::result::Result<T, Error>;
