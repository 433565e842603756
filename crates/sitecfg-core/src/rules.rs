//! Validation rules and the rule registry
//!
//! A rule is a named, pure check over the merged configuration. Rules run in
//! registration order and report every violation they find; the resolver turns
//! those into [`ValidationEntry`] values.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::report::{Severity, ValidationEntry};
use crate::schema::Schema;
use crate::value::{index_path, Value};

/// Signature of a rule check
pub type CheckFn = dyn Fn(&RuleContext<'_>) -> Vec<Violation> + Send + Sync;

/// What a rule checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// An option must be present
    Required,
    /// A present option must have a given shape or value
    Format,
    /// Several options must agree with each other
    CrossField,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Required => write!(f, "required"),
            RuleKind::Format => write!(f, "format"),
            RuleKind::CrossField => write!(f, "cross-field"),
        }
    }
}

/// Everything a check may look at
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// The merged, reference-resolved configuration
    pub config: &'a Value,
    /// Project root for filesystem checks
    pub root: &'a Path,
}

impl<'a> RuleContext<'a> {
    /// Create a new context
    pub fn new(config: &'a Value, root: &'a Path) -> Self {
        Self { config, root }
    }

    /// Look up an option, treating absence as `None`
    pub fn get(&self, path: &str) -> Option<&'a Value> {
        self.config.lookup(path)
    }

    /// Look up a string option
    pub fn get_str(&self, path: &str) -> Option<&'a str> {
        self.get(path).and_then(Value::as_str)
    }
}

/// One place where a check failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Option path the violation is about
    pub path: String,
    /// Extra detail appended to the rule message
    pub detail: Option<String>,
}

impl Violation {
    /// A violation at `path` using only the rule message
    pub fn at(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            detail: None,
        }
    }

    /// Attach detail to the violation
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// A named predicate over the resolved configuration
#[derive(Clone)]
pub struct ValidationRule {
    name: String,
    path: String,
    kind: RuleKind,
    severity: Severity,
    message: String,
    check: Arc<CheckFn>,
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationRule")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl ValidationRule {
    /// Create a rule from an arbitrary check
    pub fn new<F>(
        name: impl Into<String>,
        path: impl Into<String>,
        kind: RuleKind,
        message: impl Into<String>,
        check: F,
    ) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Vec<Violation> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            severity: Severity::Error,
            message: message.into(),
            check: Arc::new(check),
        }
    }

    /// The option at `path` must be present and not an empty string
    pub fn required(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let target = path.clone();
        Self::new(
            name,
            path.clone(),
            RuleKind::Required,
            format!("'{}' is required", path),
            move |ctx| match ctx.get(&target) {
                None => vec![Violation::at(&target)],
                Some(Value::String(s)) if s.trim().is_empty() => {
                    vec![Violation::at(&target).with_detail("value is empty")]
                }
                Some(_) => Vec::new(),
            },
        )
    }

    /// A present option must be an absolute http(s) URL
    pub fn absolute_url(name: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::format(name, path, "must be an absolute http(s) URL", |value| {
            let text = value
                .as_str()
                .ok_or_else(|| format!("expected a string, got {}", value.type_name()))?;
            let parsed = url::Url::parse(text).map_err(|e| format!("'{}': {}", text, e))?;
            if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
                return Err(format!("'{}' is not an http(s) URL", text));
            }
            Ok(())
        })
    }

    /// A present option must be one of `allowed`
    pub fn one_of<I, S>(name: impl Into<String>, path: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        let message = format!("must be one of: {}", allowed.join(", "));
        Self::format(name, path, message, move |value| match value.as_str() {
            Some(s) if allowed.iter().any(|a| a == s) => Ok(()),
            Some(s) => Err(format!("got '{}'", s)),
            None => Err(format!("expected a string, got {}", value.type_name())),
        })
    }

    /// A present option must be a string matching `pattern`
    pub fn matches(
        name: impl Into<String>,
        path: impl Into<String>,
        pattern: &str,
    ) -> Result<Self> {
        let regex = regex::Regex::new(pattern)
            .map_err(|e| Error::parse(format!("Invalid rule pattern '{}': {}", pattern, e)))?;
        let message = format!("must match /{}/", pattern);
        Ok(Self::format(name, path, message, move |value| match value
            .as_str()
        {
            Some(s) if regex.is_match(s) => Ok(()),
            Some(s) => Err(format!("got '{}'", s)),
            None => Err(format!("expected a string, got {}", value.type_name())),
        }))
    }

    /// A present option must have the given type (as named by [`Value::type_name`])
    pub fn of_type(
        name: impl Into<String>,
        path: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::format(name, path, format!("must be a {}", expected), move |value| {
            if value.type_name() == expected {
                Ok(())
            } else {
                Err(format!("got {}", value.type_name()))
            }
        })
    }

    /// A present option must name existing files
    ///
    /// The option may be a single path or a sequence of paths. Relative paths
    /// are taken from `subdir` under the project root, or the root itself.
    pub fn file_exists(
        name: impl Into<String>,
        path: impl Into<String>,
        subdir: Option<&str>,
    ) -> Self {
        let path = path.into();
        let target = path.clone();
        let subdir = subdir.map(PathBuf::from);
        let message = match &subdir {
            Some(dir) => format!("file must exist under {}", dir.display()),
            None => "file must exist".to_string(),
        };

        Self::new(name, path, RuleKind::Format, message, move |ctx| {
            let Some(value) = ctx.get(&target) else {
                return Vec::new();
            };
            let base = match &subdir {
                Some(dir) => ctx.root.join(dir),
                None => ctx.root.to_path_buf(),
            };

            let candidates: Vec<(String, &Value)> = match value {
                Value::Sequence(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (index_path(&target, i), item))
                    .collect(),
                other => vec![(target.clone(), other)],
            };

            candidates
                .into_iter()
                .filter_map(|(item_path, item)| match item.as_str() {
                    Some(file) => {
                        let full = base.join(file);
                        (!full.exists()).then(|| {
                            Violation::at(item_path)
                                .with_detail(format!("'{}' not found", full.display()))
                        })
                    }
                    None => Some(Violation::at(item_path).with_detail(format!(
                        "expected a file path, got {}",
                        item.type_name()
                    ))),
                })
                .collect()
        })
    }

    /// A check spanning several options
    pub fn cross_field<F>(
        name: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        check: F,
    ) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Vec<Violation> + Send + Sync + 'static,
    {
        Self::new(name, path, RuleKind::CrossField, message, check)
    }

    /// Every violation of a JSON Schema
    pub fn schema(name: impl Into<String>, schema: Schema) -> Self {
        Self::new(
            name,
            "",
            RuleKind::Format,
            "does not match the schema",
            move |ctx| {
                schema
                    .violations(ctx.config)
                    .into_iter()
                    .map(|v| Violation::at(v.path).with_detail(v.message))
                    .collect()
            },
        )
    }

    /// A single-value format check that skips absent options
    ///
    /// `check` returns the violation detail on failure.
    pub fn format<F>(
        name: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
        check: F,
    ) -> Self
    where
        F: Fn(&Value) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        let path = path.into();
        let target = path.clone();
        Self::new(name, path, RuleKind::Format, message, move |ctx| {
            match ctx.get(&target).map(&check) {
                Some(Err(detail)) => vec![Violation::at(&target).with_detail(detail)],
                _ => Vec::new(),
            }
        })
    }

    /// Downgrade this rule to a warning
    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }

    /// Replace the rule message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Rule name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Option path the rule is about (empty for whole-tree rules)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// What kind of check this is
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Severity of the entries this rule produces
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Message used for every violation
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Run the check and turn violations into report entries
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<ValidationEntry> {
        (self.check)(ctx)
            .into_iter()
            .map(|violation| {
                let message = match violation.detail {
                    Some(detail) => format!("{} ({})", self.message, detail),
                    None => self.message.clone(),
                };
                ValidationEntry::new(&self.name, violation.path, self.severity, message)
            })
            .collect()
    }
}

/// Ordered registry of validation rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ValidationRule>,
}

impl RuleSet {
    /// Create a new empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule; its name must be unique
    pub fn register(&mut self, rule: ValidationRule) -> Result<()> {
        self.register_with_force(rule, false)
    }

    /// Register a rule with optional force overwrite.
    ///
    /// A forced rule replaces the existing one in place, keeping its position
    /// in the run order.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(Error)` if force=false and a rule with the same name exists
    pub fn register_with_force(&mut self, rule: ValidationRule, force: bool) -> Result<()> {
        match self.rules.iter().position(|r| r.name == rule.name) {
            Some(_) if !force => Err(Error::rule_already_registered(&rule.name)),
            Some(idx) => {
                self.rules[idx] = rule;
                Ok(())
            }
            None => {
                self.rules.push(rule);
                Ok(())
            }
        }
    }

    /// Remove a rule by name, returning it if it was registered
    pub fn remove(&mut self, name: &str) -> Option<ValidationRule> {
        let idx = self.rules.iter().position(|r| r.name == name)?;
        Some(self.rules.remove(idx))
    }

    /// Get a rule by name
    pub fn get(&self, name: &str) -> Option<&ValidationRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Check if a rule is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Rules in run order
    pub fn iter(&self) -> impl Iterator<Item = &ValidationRule> {
        self.rules.iter()
    }

    /// Number of registered rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule in order and collect all entries
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<ValidationEntry> {
        let mut entries = Vec::new();
        for rule in &self.rules {
            let found = rule.evaluate(ctx);
            log::trace!("Rule '{}' produced {} entries", rule.name, found.len());
            entries.extend(found);
        }
        entries
    }
}
