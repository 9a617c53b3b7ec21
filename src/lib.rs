//! Pulls source files out of free-form model responses.
//!
//! A response is scanned for fenced C-family code blocks. Each block gets a
//! filename from, in order: the fence line, a comment in its first lines,
//! a table of well-known identifiers, or a default header/implementation
//! name. The result is an ordered `filename -> code` mapping.

pub mod contexts;
pub mod data;
pub mod manifest;
pub mod registries;

use data::{AttributionResult, SectionMatch, ValidationOutcome};

/// Extracts code from `response` using the built-in rule table.
pub fn extract(response: &str) -> AttributionResult {
    contexts::Extractor::default().extract(response)
}

/// Shallow structural check of one extracted body. See [`contexts::validate`].
pub fn validate(code: &str) -> ValidationOutcome {
    contexts::validate(code)
}

/// Filenames introduced in the prose of `response`, with surrounding text.
pub fn locate_sections(response: &str) -> Vec<SectionMatch> {
    contexts::locate_sections(response)
}
