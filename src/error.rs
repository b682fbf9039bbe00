//! Error type shared by the store, dispatcher and API layers

use thiserror::Error;

/// Failures surfaced by the service around the timer core.
///
/// The countdown logic itself never fails; these cover the collaborators.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("url '{0}' has no host")]
    MissingHost(String),

    #[error("domain must not be empty")]
    EmptyDomain,

    #[error("failed to lock {0}")]
    LockPoisoned(&'static str),

    #[error("failed to read site file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse site file: {0}")]
    Json(#[from] serde_json::Error),
}
