//! Structured error types for configuration operations.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Load errors
    ConfigNotFound,
    ParseFailed,

    // Lookup errors
    NavigationFailed,
    AttributeNotFound,
    KeyNotFound,

    // Resolution errors
    CompositionFailed,
    InterpolationFailed,

    // Precondition failures surfaced to the user as one-line messages
    ValidationFailed,

    // Internal errors
    Io,
    InternalError,
}

/// Structured error for configuration operations.
#[derive(Debug, Serialize)]
pub struct BuddyError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl BuddyError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            details: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// True for precondition failures the CLI reports and exits 1 on.
    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::ValidationFailed
    }

    // Convenience constructors

    pub fn config_not_found(path: &Path) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.display()),
        )
        .with_path(path)
    }

    pub fn parse(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::ParseFailed,
            format!("Failed to parse {}", path.display()),
        )
        .with_path(path)
        .with_details(err.to_string())
    }

    pub fn navigation(segment: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::NavigationFailed,
            format!("Cannot walk into '{}': {}", segment, reason),
        )
    }

    pub fn attribute_not_found(key: &str) -> Self {
        Self::new(
            ErrorCode::AttributeNotFound,
            format!("Key '{}' not found", key),
        )
    }

    pub fn key_not_found(key: &str) -> Self {
        Self::new(ErrorCode::KeyNotFound, format!("No such key: '{}'", key))
    }

    pub fn composition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CompositionFailed, message)
    }

    pub fn interpolation(expr: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::InterpolationFailed,
            format!("Cannot resolve '${{{}}}': {}", expr, reason),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn io(path: &Path, err: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::Io,
            format!("I/O error on {}: {}", path.display(), err),
        )
        .with_path(path)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for BuddyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{} ({})", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BuddyError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for BuddyError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<BuddyError>() {
            Ok(buddy_err) => buddy_err,
            Err(err) => BuddyError::internal(err),
        }
    }
}

/// Result type for configuration operations.
pub type BuddyResult<T> = std::result::Result<T, BuddyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_and_key_misses_are_distinct() {
        let attr = BuddyError::attribute_not_found("host");
        let key = BuddyError::key_not_found("host");
        assert_eq!(attr.code, ErrorCode::AttributeNotFound);
        assert_eq!(key.code, ErrorCode::KeyNotFound);
        assert_ne!(attr.code, key.code);
    }

    #[test]
    fn test_display_includes_details() {
        let err = BuddyError::parse(Path::new("config.yaml"), "bad indent");
        assert_eq!(err.to_string(), "Failed to parse config.yaml (bad indent)");
    }

    #[test]
    fn test_anyhow_roundtrip_keeps_code() {
        let original = BuddyError::validation("nope");
        let wrapped: anyhow::Error = original.into();
        let back = BuddyError::from(wrapped);
        assert!(back.is_validation());
    }

    #[test]
    fn test_serialize_code_screaming_case() {
        let err = BuddyError::key_not_found("x");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "KEY_NOT_FOUND");
        assert!(json.get("path").is_none());
    }
}
