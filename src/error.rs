//! Unified error handling for the fetchr crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available for callers that want to match on them.
//!
//! # Architecture
//!
//! - [`FetchrErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

pub use crate::utils::error::{FetchError, PipelineError};

/// Common trait for all fetchr error types
pub trait FetchrErrorTrait: std::error::Error {
    /// Check if this error is transient
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, API status)
    Network,
    /// Decoding and encoding errors
    Parsing,
    /// Output file errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Interrupted runs
    Cancelled,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the fetchr crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Pipeline errors (listing, detail, output, cancellation)
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl FetchrErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        FetchError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl FetchrErrorTrait for PipelineError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Listing(e) | Self::Detail { source: e, .. } => e.is_recoverable(),
            Self::Io(_) | Self::Encode(_) | Self::TaskFailed(_) | Self::Cancelled => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Listing(e) | Self::Detail { source: e, .. } => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Encode(_) => ErrorCategory::Parsing,
            Self::TaskFailed(_) => ErrorCategory::Other,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

impl FetchrErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => FetchrErrorTrait::is_recoverable(e),
            Self::Pipeline(e) => e.is_recoverable(),
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Pipeline(e) => e.category(),
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
