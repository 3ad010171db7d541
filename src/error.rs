use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the library.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP client failed to send a request or read its body.
    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(StatusCode),

    /// A payload could not be decoded.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A response did not contain the expected top-level key.
    #[error("response is missing the `{0}` key")]
    MissingKey(String),

    /// An item in a response was not a JSON object.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(String),

    /// The query or client configuration was rejected.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

/// Invalid settings, rejected when a [`Search`] or [`Client`] is built.
///
/// [`Search`]: crate::search::Search
/// [`Client`]: crate::Client
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// `sf` is not one of the known sort fields.
    #[error("unknown sort field `{0}`")]
    UnknownSortField(String),

    /// `sd` is neither `asc` nor `desc`.
    #[error("unknown sort direction `{0}`, expected `asc` or `desc`")]
    UnknownSortDirection(String),

    /// `filter_id` is not a numeric filter id.
    #[error("invalid filter id `{0}`")]
    InvalidFilter(String),

    /// Pages are numbered from 1.
    #[error("invalid page {0}, pages start at 1")]
    InvalidPage(u32),

    /// Reverse search distance must lie in `(0, 1]`.
    #[error("invalid reverse search distance {0}")]
    InvalidDistance(f64),

    /// Proxy map keys must be `http`, `https` or `all`.
    #[error("unknown proxy scheme `{0}`")]
    UnknownProxyScheme(String),
}
