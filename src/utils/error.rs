//! Error types for the fetchr pipeline
//!
//! This module defines the domain error types used by the fetcher, the
//! listing stage and the worker pipeline.

use thiserror::Error;

/// Errors that can occur while talking to the photo API
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Server returned status {0}")]
    Status(u16),

    /// The API answered with `"stat": "fail"`
    #[error("flickr error: {message}")]
    Api { code: Option<i64>, message: String },

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Check if the error is likely transient
    ///
    /// Nothing in the pipeline retries; this only feeds error classification.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Api { .. } | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A listing page could not be fetched
    #[error("Listing failed: {0}")]
    Listing(#[source] FetchError),

    /// A detail lookup failed while running in abort mode
    #[error("Detail fetch failed for photo {photo_id}: {source}")]
    Detail {
        photo_id: String,
        #[source]
        source: FetchError,
    },

    /// Output file could not be created, written or synced
    #[error("Output I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded as JSON
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A worker or writer task panicked
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    /// The run was interrupted before it could finish
    #[error("Run cancelled")]
    Cancelled,
}
