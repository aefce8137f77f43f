//! Error types for properties reading
//!
//! Every failure carries enough of the offending source line to point the
//! user at the exact entry that aborted the read.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main error type for configuration reading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed input line
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Leaf property not recognized by the handler it was routed to
    #[error("Unrecognized property '{line}' (line {ordinal})")]
    UnrecognizedProperty {
        name: String,
        value: String,
        line: String,
        ordinal: usize,
    },

    /// Intermediate name segment without a nested handler (strict mode only)
    #[error("Unrecognized name element '{element}' in '{name}' (line {ordinal})")]
    UnrecognizedNameElement {
        element: String,
        name: String,
        line: String,
        ordinal: usize,
    },

    /// The same property name appeared more than once
    #[error("Duplicate property '{name}': '{first}' and '{second}'")]
    DuplicateProperty {
        name: String,
        first: String,
        second: String,
    },

    /// A value could not be converted to the type a handler asked for
    #[error("Invalid value '{value}' for '{name}': {message}")]
    InvalidValue {
        name: String,
        value: String,
        message: String,
    },

    /// A nested handler claimed more name elements than the line has
    #[error(
        "Nested handler for '{segment}' consumes {consumed} name element(s), only {available} available"
    )]
    InvalidNesting {
        segment: String,
        consumed: usize,
        available: usize,
    },

    /// Context nesting went past the configured limit
    #[error("Maximum nesting depth {max_depth} exceeded at '{name}'")]
    MaxDepthExceeded { name: String, max_depth: usize },

    /// A target object was not of the type its handler expected
    #[error("Target for '{name}' is not a {expected}")]
    TargetType { name: String, expected: &'static str },

    /// Failure reported by a handler implementation
    #[error("Handler error: {message}")]
    Handler { message: String },

    /// Failure reading a configuration file
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error from a reader source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serde deserialization error
    #[error("Serde error: {0}")]
    Serde(#[from] SerdeError),
}

/// Line format errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// No `=` separating the name from the value
    #[error("missing '=' in '{line}' (line {ordinal})")]
    MissingSeparator { line: String, ordinal: usize },

    /// Nothing before the `=`
    #[error("empty property name in '{line}' (line {ordinal})")]
    EmptyKey { line: String, ordinal: usize },
}

/// Serde integration errors
#[derive(Debug, Error)]
pub enum SerdeError {
    /// Custom serde error message
    #[error("{0}")]
    Custom(String),

    /// Missing required field
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// Unknown field encountered
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },
}

impl FormatError {
    /// Returns the raw text of the rejected line
    pub fn line(&self) -> &str {
        match self {
            FormatError::MissingSeparator { line, .. } | FormatError::EmptyKey { line, .. } => line,
        }
    }

    /// Returns the ordinal of the rejected line
    pub fn ordinal(&self) -> usize {
        match self {
            FormatError::MissingSeparator { ordinal, .. }
            | FormatError::EmptyKey { ordinal, .. } => *ordinal,
        }
    }

    /// Generate suggestions for format errors
    pub fn suggest_fix(&self) -> Vec<String> {
        match self {
            FormatError::MissingSeparator { line, .. } => vec![
                format!("Write the entry as '{}=<value>'", line),
                "Prefix the line with '#' to turn it into a comment".to_string(),
            ],
            FormatError::EmptyKey { .. } => {
                vec!["Add a dotted property name before '=', e.g. 'server.port=8080'".to_string()]
            }
        }
    }
}

impl ConfigError {
    /// Creates a handler error from any displayable message
    pub fn handler(message: impl fmt::Display) -> Self {
        ConfigError::Handler {
            message: message.to_string(),
        }
    }

    /// Returns the raw source line this error refers to, when there is one
    pub fn source_line(&self) -> Option<&str> {
        match self {
            ConfigError::Format(err) => Some(err.line()),
            ConfigError::UnrecognizedProperty { line, .. }
            | ConfigError::UnrecognizedNameElement { line, .. } => Some(line),
            ConfigError::DuplicateProperty { second, .. } => Some(second),
            _ => None,
        }
    }
}

impl serde::de::Error for ConfigError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ConfigError::Serde(SerdeError::Custom(msg.to_string()))
    }

    fn missing_field(field: &'static str) -> Self {
        ConfigError::Serde(SerdeError::MissingField {
            field: field.to_string(),
        })
    }

    fn unknown_field(field: &str, _expected: &'static [&'static str]) -> Self {
        ConfigError::Serde(SerdeError::UnknownField {
            field: field.to_string(),
        })
    }
}

impl serde::de::Error for SerdeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        SerdeError::Custom(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_accessors() {
        let err = FormatError::MissingSeparator {
            line: "novalue".to_string(),
            ordinal: 3,
        };
        assert_eq!(err.line(), "novalue");
        assert_eq!(err.ordinal(), 3);
        assert_eq!(err.suggest_fix().len(), 2);
    }

    #[test]
    fn test_config_error_source_line() {
        let err = ConfigError::from(FormatError::EmptyKey {
            line: "=onlyvalue".to_string(),
            ordinal: 1,
        });
        assert_eq!(err.source_line(), Some("=onlyvalue"));

        let err = ConfigError::handler("boom");
        assert_eq!(err.source_line(), None);
        assert_eq!(err.to_string(), "Handler error: boom");
    }

    #[test]
    fn test_read_error_display() {
        let err = ConfigError::Read {
            path: PathBuf::from("/nonexistent/app.properties"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read '/nonexistent/app.properties': not found"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
