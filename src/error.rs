use thiserror::Error;

/// Errors that can occur while resolving, selecting or rendering a non-linear ad
#[derive(Error, Debug)]
pub enum VastError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Failed to decode JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("An overlay is already mounted on this player")]
    OverlayAlreadyMounted,

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unknown error: {0}")]
    Other(String),
}

/// Why an ad could not be shown for this playback session.
///
/// None of these reach the host player as a failure; they end the ad
/// lifecycle and playback carries on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdFailure {
    #[error("The ad server returned no response")]
    NoAdResponse,

    #[error("No ad carried a non-linear creative with variations")]
    NoEligibleCreative,

    #[error("The selected variation is not an image")]
    UnsupportedVariationType,
}

pub type Result<T> = std::result::Result<T, VastError>;
