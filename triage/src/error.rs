//! Triage error types
//!
//! Errors only surface at the configuration and data-source boundaries.
//! Everything that happens while classifying a single issue is contained
//! locally and degrades to a default value instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for triage operations
pub type TriageResult<T> = Result<T, TriageError>;

/// Errors that cross the engine boundary.
#[derive(Error, Debug)]
pub enum TriageError {
    /// Configuration file could not be read
    #[error("Failed to read configuration at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration ({format}): {message}")]
    ConfigParse { format: String, message: String },

    /// Configuration parsed but failed validation
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Unsupported configuration file extension
    #[error("Unsupported configuration format: {extension}")]
    UnsupportedFormat { extension: String },

    /// An issue source failed to deliver data
    #[error("Issue source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },
}

impl TriageError {
    /// Create a config parse error
    pub fn config_parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigParse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a config validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a source error
    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether the caller can keep running on a fallback (minimal config or
    /// sentinel dataset) instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ConfigValidation { .. } | Self::ConfigParse { .. } | Self::Source { .. } => true,
            Self::ConfigIo { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::UnsupportedFormat { .. } => false,
        }
    }
}

/// Failure to turn a rule pattern string into a regex.
///
/// Never fatal: the offending pattern is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// Pattern was empty after stripping delimiters
    #[error("Empty pattern: {pattern:?}")]
    Empty { pattern: String },

    /// Regex engine rejected the pattern
    #[error("Invalid pattern {pattern:?}: {message}")]
    Invalid { pattern: String, message: String },
}

impl PatternError {
    /// The raw pattern string as it appeared in configuration
    pub fn pattern(&self) -> &str {
        match self {
            Self::Empty { pattern } | Self::Invalid { pattern, .. } => pattern,
        }
    }
}
