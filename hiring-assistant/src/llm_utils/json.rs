//! JSON utilities for extraction, parsing, and validation
//!
//! Language models regularly wrap JSON in markdown fences or surround it
//! with prose. These helpers strip the wrapping before parsing.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// Extract JSON content from markdown code blocks or raw text
///
/// Handles:
/// - ```json blocks
/// - Generic ``` blocks
/// - Raw JSON text, possibly surrounded by prose
pub fn extract_json(text: &str) -> String {
    let json = if text.contains("```json") {
        // Extract from ```json block
        let json_start = text.find("```json").unwrap() + 7;
        let json_end = text[json_start..]
            .rfind("```")
            .map(|pos| pos + json_start)
            .unwrap_or(text.len());
        text[json_start..json_end].trim().to_string()
    } else if text.contains("```") {
        // Extract from generic ``` block
        let json_start = text.find("```").unwrap() + 3;
        let json_end = text[json_start..]
            .rfind("```")
            .map(|pos| pos + json_start)
            .unwrap_or(text.len());
        text[json_start..json_end].trim().to_string()
    } else {
        text.trim().to_string()
    };

    trim_to_json(&json)
}

/// Trim surrounding prose by keeping the outermost JSON value
///
/// Finds the first `{` or `[` and the matching last `}` or `]`. Returns the
/// input unchanged when no bracket pair is found (the parse will then fail
/// and the caller's fallback path takes over).
pub fn trim_to_json(text: &str) -> String {
    let trimmed = text.trim();

    let open = trimmed.find(|c| c == '{' || c == '[');
    let close = trimmed.rfind(|c| c == '}' || c == ']');

    match (open, close) {
        (Some(start), Some(end)) if start < end => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Parse JSON string into a typed structure with error context
pub fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).context("Failed to parse JSON")
}

/// Parse JSON string into a flexible `serde_json::Value`
pub fn parse_json_value(json: &str) -> Result<serde_json::Value> {
    serde_json::from_str(json).context("Failed to parse JSON value")
}
