//! Error types for the AV Portal client

/// Result type alias for AV Portal operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the AV Portal client
///
/// Only caller mistakes surface as errors: building a [`Resource`] from a
/// payload without a `ref`, or querying with an unsupported asset type.
/// Transport and decode failures on the remote service are recovered inside
/// the client and degrade to empty results.
///
/// [`Resource`]: crate::Resource
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Resource payload without a `ref` field
    #[error("Invalid resource data")]
    InvalidResource,

    /// An asset type outside VIDEO/PHOTO/REPORTAGE was requested
    #[error("Invalid asset type \"{requested}\" requested, allowed types are \"{allowed}\"")]
    InvalidAssetType { requested: String, allowed: String },

    /// HTTP client could not be constructed or a request failed fatally
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error (from serde_yaml/anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
