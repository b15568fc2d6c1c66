use thiserror::Error;

/// Result type for transmission operations.
pub type Result<T> = std::result::Result<T, TransmitError>;

/// Errors surfaced by the file transmission subsystem.
///
/// The enum is `Clone` (string payloads only) so a single terminal error can
/// be handed to every concurrent caller waiting on the same cached upload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransmitError {
    /// Binary payload handling was attempted without a host capable of
    /// reading the blob handle. Raised before any network call.
    #[error("blob handle not readable in this environment: {0}")]
    Environment(String),

    /// The request named a content type the codec has no encoding for.
    #[error("unsupported content type for binary payload: {0}")]
    UnsupportedContentType(String),

    /// The caller-supplied options could not be merged into a complete request.
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    /// Network or transport failure, passed through opaquely.
    #[error("transport error: {0}")]
    Transport(String),

    /// Poll attempts were exhausted before the upload was confirmed.
    #[error("upload not confirmed after {attempts} status checks")]
    Timeout { attempts: u32 },

    /// The owning cache entry was invalidated while the upload was in flight.
    #[error("upload cancelled: {0}")]
    Cancelled(String),

    /// Configuration could not be loaded or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TransmitError {
    fn from(err: reqwest::Error) -> Self {
        TransmitError::Transport(err.to_string())
    }
}
