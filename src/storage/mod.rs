//! Output storage
//!
//! The crawl result is a single JSON array file written incrementally by
//! one writer task.

pub mod json;

pub use json::JsonArrayWriter;
