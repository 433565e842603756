//! Error types for sitecfg
//!
//! Two layers of failure exist:
//! - [`Error`]: structured errors with path context and an actionable help
//!   message, raised while loading fragments, registering rules or reading a
//!   resolved config.
//! - [`ResolveError`]: the outcome of a failed resolution pass. Input errors are
//!   fatal; validation failures carry the full report.

use std::fmt;

use crate::report::ValidationReport;

/// Result type alias for sitecfg operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sitecfg operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Option path where the error occurred (e.g., "themeConfig.logo.src")
    pub path: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON or a path expression
    Parse,
    /// A fragment could not be built from the given values
    InvalidFragment,
    /// Error accessing a path that doesn't exist
    PathNotFound,
    /// Type coercion failed
    TypeCoercion,
    /// I/O error (file not found, etc.)
    Io,
    /// A rule with the same name is already registered
    RuleAlreadyRegistered { name: String },
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            source_location: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an invalid fragment error
    pub fn invalid_fragment(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidFragment,
            path: None,
            source_location: None,
            help: Some(format!(
                "Check the values supplied by fragment '{}'",
                source_id.into()
            )),
            cause: Some(message.into()),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            kind: ErrorKind::PathNotFound,
            path: Some(path_str.clone()),
            source_location: None,
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            cause: None,
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            path: Some(path.into()),
            source_location: None,
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create an I/O error for a file that could not be read
    pub fn io(file: impl Into<String>, message: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            kind: ErrorKind::Io,
            path: None,
            source_location: Some(SourceLocation {
                file,
                line: None,
                column: None,
            }),
            help: Some("Check that the file exists and is readable".into()),
            cause: Some(message.into()),
        }
    }

    /// Create a rule already registered error
    pub fn rule_already_registered(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::RuleAlreadyRegistered { name: n.clone() },
            path: None,
            source_location: None,
            help: Some(format!(
                "Use register_with_force(..., true) to replace the '{}' rule",
                n
            )),
            cause: None,
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::InvalidFragment => write!(f, "Invalid configuration fragment")?,
            ErrorKind::PathNotFound => write!(f, "Path not found")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::RuleAlreadyRegistered { name } => {
                write!(f, "Validation rule '{}' is already registered", name)?
            }
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

/// Why a resolution pass produced no config
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    /// No fragments were supplied
    #[error("no configuration fragments were supplied")]
    EmptyInput,
    /// Two fragments share a source id
    #[error("duplicate fragment source id '{0}'")]
    DuplicateSourceId(String),
    /// The merged configuration violates at least one error-severity rule
    #[error("configuration is invalid: {} error(s), {} warning(s)", .0.error_count(), .0.warning_count())]
    Invalid(ValidationReport),
}

impl ResolveError {
    /// The validation report, if the pass got far enough to produce one
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ResolveError::Invalid(report) => Some(report),
            _ => None,
        }
    }
}
