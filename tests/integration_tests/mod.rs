//! Integration tests module
//!
//! End-to-end runs of the crawler against a mocked Flickr API:
//! - Complete list → detail → save pipeline
//! - Error handling in abort and collect modes

pub mod error_scenarios;
pub mod fixtures;
