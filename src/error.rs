//! Error types for the fetch boundary.
//!
//! Failures are classified so that logs can distinguish "the site is down"
//! from "the site changed shape". None of these errors escape past the
//! source fetcher: a failing source is logged and contributes zero items.

use thiserror::Error;

/// Errors that can occur while retrieving or decoding a single source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure, or a non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Headless browser failed to launch, navigate or render.
    #[error("browser error: {0}")]
    Browser(String),

    /// The response body could not be decoded (HTML, XML or JSON).
    #[error("parse error: {0}")]
    Parse(String),
}

pub type FetchResult<T> = Result<T, FetchError>;
