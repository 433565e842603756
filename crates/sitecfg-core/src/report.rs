//! Validation reports
//!
//! A report is the ordered list of every problem found during one resolution
//! pass: failed references first, then rule violations in rule declaration
//! order.

use serde::Serialize;
use std::fmt;

/// How serious a validation entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks production of a resolved config
    Error,
    /// Reported alongside the resolved config
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single problem found during a resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationEntry {
    /// Name of the rule (or reference check) that produced this entry
    pub rule: String,
    /// Option path the entry is about (e.g., "themeConfig.logo.src")
    pub path: String,
    /// Severity of the entry
    pub severity: Severity,
    /// Human readable description
    pub message: String,
}

impl ValidationEntry {
    /// Create a new entry
    pub fn new(
        rule: impl Into<String>,
        path: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            path: path.into(),
            severity,
            message: message.into(),
        }
    }

    /// Whether this entry blocks resolution
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}[{}]: {}", self.severity, self.rule, self.message)
        } else {
            write!(
                f,
                "{}[{}] {}: {}",
                self.severity, self.rule, self.path, self.message
            )
        }
    }
}

/// Ordered sequence of validation entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationReport {
    entries: Vec<ValidationEntry>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: ValidationEntry) {
        self.entries.push(entry);
    }

    /// All entries, in the order they were found
    pub fn entries(&self) -> &[ValidationEntry] {
        &self.entries
    }

    /// Entries with severity error
    pub fn errors(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter().filter(|e| e.severity == Severity::Error)
    }

    /// Entries with severity warning
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
    }

    /// Number of error entries
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Number of warning entries
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Whether any entry blocks resolution
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(ValidationEntry::is_error)
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report holds no entries at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<ValidationEntry> for ValidationReport {
    fn extend<T: IntoIterator<Item = ValidationEntry>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl FromIterator<ValidationEntry> for ValidationReport {
    fn from_iter<T: IntoIterator<Item = ValidationEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationEntry;
    type IntoIter = std::vec::IntoIter<ValidationEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
