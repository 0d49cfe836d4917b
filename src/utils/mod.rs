//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

/// Truncate text to a maximum length, respecting char boundaries
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Hide all but the last four characters of a credential for logging
pub fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("{}{tail}", "*".repeat(len - 4))
}
