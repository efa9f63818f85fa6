//! Error types for Solidafy Tables
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for Solidafy Tables
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Schema Build Errors
    // ============================================================================
    #[error("Schema build failed for table '{table}': {message}")]
    SchemaBuild { table: String, message: String },

    #[error("Cyclic nesting detected: {}", path.join(" -> "))]
    CyclicNesting { path: Vec<String> },

    #[error("Duplicate table name: {table}")]
    DuplicateTable { table: String },

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Natural key column '{column}' not found in table '{table}'")]
    UnknownNaturalKey { table: String, column: String },

    #[error("Table '{table}' not found in catalog")]
    TableNotFound { table: String },

    // ============================================================================
    // Key Synthesis Errors
    // ============================================================================
    #[error("Cannot synthesize key: {message}")]
    KeySynthesis { message: String },

    // ============================================================================
    // HTTP / Pagination Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Pagination did not terminate after {max_pages} pages")]
    PaginationOverflow { max_pages: usize },

    #[error("Pagination cancelled after {pages} pages")]
    PaginationCancelled { pages: usize },

    #[error("Failed to extract records from path '{path}': {message}")]
    RecordExtraction { path: String, message: String },

    // ============================================================================
    // Arrow Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error in '{template}': {message}")]
    Template { template: String, message: String },

    #[error("Unknown template: {name}")]
    UnknownTemplate { name: String },

    #[error("Template '{template}' references undefined field: {field}")]
    MissingTemplateField { template: String, field: String },

    // ============================================================================
    // Golden Verification Errors
    // ============================================================================
    #[error("Golden file not found: {path}")]
    GoldenMissing { path: String },

    #[error(
        "Golden mismatch for {path} at line {line}\n--- expected\n{expected}\n+++ actual\n{actual}"
    )]
    GoldenMismatch {
        path: String,
        line: usize,
        expected: String,
        actual: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a schema build error
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaBuild {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a key synthesis error
    pub fn key(message: impl Into<String>) -> Self {
        Self::KeySynthesis {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a record extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordExtraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create a missing template field error
    pub fn missing_field(template: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingTemplateField {
            template: template.into(),
            field: field.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable by an outer retry policy
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error aborts schema construction
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Error::SchemaBuild { .. }
                | Error::CyclicNesting { .. }
                | Error::DuplicateTable { .. }
                | Error::DuplicateColumn { .. }
                | Error::UnknownNaturalKey { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for Solidafy Tables
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::CyclicNesting {
            path: vec!["Node".into(), "Child".into(), "Node".into()],
        };
        assert_eq!(err.to_string(), "Cyclic nesting detected: Node -> Child -> Node");

        let err = Error::missing_field("create_table", "table.name");
        assert_eq!(
            err.to_string(),
            "Template 'create_table' references undefined field: table.name"
        );

        let err = Error::PaginationOverflow { max_pages: 5 };
        assert_eq!(err.to_string(), "Pagination did not terminate after 5 pages");
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(503, "").is_retryable());

        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::PaginationOverflow { max_pages: 10 }.is_retryable());
        assert!(!Error::PaginationCancelled { pages: 1 }.is_retryable());
    }

    #[test]
    fn test_is_schema_error() {
        assert!(Error::schema("t", "bad").is_schema_error());
        assert!(Error::CyclicNesting { path: vec![] }.is_schema_error());
        assert!(!Error::key("bad").is_schema_error());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}
