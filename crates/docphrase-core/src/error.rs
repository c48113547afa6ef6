//! Unified error type and output error codes.
//!
//! Component errors (`RuleError`, `MarkupError`, `RewriteError`,
//! `ConfigError`, `EvalError`) bridge into [`DocError`], which carries a
//! stable numeric code for JSON output and process exit status:
//!
//! - `2`: invalid arguments (bad flags, invalid rules or configuration)
//! - `3`: input errors (unreadable or malformed snapshots and comments)
//! - `4`: apply errors (a rewrite could not be applied)
//! - `10`: internal errors

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::evaluate::EvalError;
use crate::markup::MarkupError;
use crate::rewrite::RewriteError;
use crate::rule::RuleError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad flags, rules, configuration).
    InvalidArguments = 2,
    /// Input errors (missing or malformed snapshot, malformed comment).
    InputError = 3,
    /// Apply errors (stale finding, conflicting edits).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum DocError {
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("invalid rule: {message}")]
    InvalidRule { message: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid snapshot {file}: {message}")]
    InvalidSnapshot { file: String, message: String },

    #[error("malformed comment in {file}: {message}")]
    MalformedComment {
        file: String,
        offset: Option<usize>,
        message: String,
    },

    #[error("apply error: {message}")]
    ApplyError { message: String, file: Option<String> },

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&DocError> for OutputErrorCode {
    fn from(err: &DocError) -> Self {
        match err {
            DocError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DocError::InvalidRule { .. } => OutputErrorCode::InvalidArguments,
            DocError::FileNotFound { .. } => OutputErrorCode::InputError,
            DocError::InvalidSnapshot { .. } => OutputErrorCode::InputError,
            DocError::MalformedComment { .. } => OutputErrorCode::InputError,
            DocError::ApplyError { .. } => OutputErrorCode::ApplyError,
            DocError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<RuleError> for DocError {
    fn from(err: RuleError) -> Self {
        DocError::InvalidRule {
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for DocError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                DocError::FileNotFound {
                    path: path.display().to_string(),
                }
            }
            other => DocError::invalid_args(other.to_string()),
        }
    }
}

impl From<RewriteError> for DocError {
    fn from(err: RewriteError) -> Self {
        DocError::ApplyError {
            message: err.to_string(),
            file: None,
        }
    }
}

impl From<EvalError> for DocError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::MalformedComment { rule, message } => DocError::MalformedComment {
                file: String::new(),
                offset: None,
                message: format!("{}: {}", rule, message),
            },
        }
    }
}

impl From<serde_json::Error> for DocError {
    fn from(err: serde_json::Error) -> Self {
        DocError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl DocError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DocError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        DocError::FileNotFound { path: path.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DocError::InternalError {
            message: message.into(),
        }
    }

    /// Attach the file a markup error came from.
    pub fn from_markup(file: impl Into<String>, err: &MarkupError) -> Self {
        DocError::MalformedComment {
            file: file.into(),
            offset: err.offset(),
            message: err.to_string(),
        }
    }

    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Generation;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_rule_maps_to_invalid_arguments() {
            let err = DocError::from(RuleError::EmptyId);
            assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn markup_maps_to_input_error() {
            let markup = MarkupError::UnclosedTag {
                name: "summary".to_string(),
                offset: 4,
            };
            let err = DocError::from_markup("a.json", &markup);
            assert_eq!(err.error_code().code(), 3);
            assert!(matches!(err, DocError::MalformedComment { offset: Some(4), .. }));
        }

        #[test]
        fn stale_maps_to_apply_error() {
            let err = DocError::from(RewriteError::Stale {
                found: Generation(0),
                current: Generation(1),
            });
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn missing_config_maps_to_file_not_found() {
            let err = DocError::from(ConfigError::Io {
                path: "x/.docphrase.json".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
            assert!(matches!(err, DocError::FileNotFound { .. }));
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            assert_eq!(DocError::internal("boom").error_code().code(), 10);
        }
    }

    mod error_display {
        use super::*;

        #[test]
        fn invalid_arguments_display() {
            let err = DocError::invalid_args("missing field");
            assert_eq!(err.to_string(), "invalid arguments: missing field");
        }

        #[test]
        fn code_display() {
            assert_eq!(format!("{}", OutputErrorCode::ApplyError), "4");
            assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
        }
    }
}
