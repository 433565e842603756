//! Resolution passes and the resolved configuration
//!
//! A [`Resolver`] merges fragments in precedence order, resolves references,
//! runs its rule set and either hands back an immutable [`ResolvedConfig`] or
//! the full validation report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, ResolveError, Result};
use crate::fragment::ConfigFragment;
use crate::reference;
use crate::report::ValidationReport;
use crate::rules::{RuleContext, RuleSet, ValidationRule};
use crate::schema::Schema;
use crate::value::{is_within, Value};

/// Winning source id for each leaf option path
pub type Provenance = IndexMap<String, String>;

/// Options for a resolution pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Project root for `${path:...}` references and file rules
    pub root: PathBuf,
}

impl ResolveOptions {
    /// Options with the given project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Merges, resolves and validates fragments
///
/// A resolver holds no per-pass state; one instance can serve any number of
/// passes, including concurrent ones.
#[derive(Debug, Clone)]
pub struct Resolver {
    options: ResolveOptions,
    rules: RuleSet,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolveOptions::default())
    }
}

impl Resolver {
    /// Create a resolver with the default site rules
    pub fn new(options: ResolveOptions) -> Self {
        Self::with_rules(options, RuleSet::site_defaults())
    }

    /// Create a resolver with a custom rule set
    pub fn with_rules(options: ResolveOptions, rules: RuleSet) -> Self {
        Self { options, rules }
    }

    /// Add a JSON Schema check, run after every other rule
    pub fn with_schema(mut self, schema: Schema) -> Result<Self> {
        self.rules.register(ValidationRule::schema("schema", schema))?;
        Ok(self)
    }

    /// The options this resolver was built with
    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// The rules run on every pass
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Mutable access to the rule set, for registering extra rules
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Run one resolution pass
    ///
    /// `fragments` are ordered lowest to highest precedence. Input errors are
    /// reported before any merging happens.
    pub fn resolve(
        &self,
        fragments: &[ConfigFragment],
    ) -> std::result::Result<ResolvedConfig, ResolveError> {
        if fragments.is_empty() {
            return Err(ResolveError::EmptyInput);
        }

        let mut seen = HashSet::new();
        for fragment in fragments {
            if !seen.insert(fragment.source_id()) {
                return Err(ResolveError::DuplicateSourceId(
                    fragment.source_id().to_string(),
                ));
            }
        }

        let (merged, provenance) = merge_fragments(fragments);
        log::debug!(
            "Merged {} fragments into {} leaf options",
            fragments.len(),
            provenance.len()
        );

        let root = self.options.root.as_path();
        let (resolved, reference_entries) = reference::resolve_references(&merged, root);
        log::debug!("Reference resolution found {} problems", reference_entries.len());

        // Values whose reference failed keep their raw text; skip rules on them
        let failed: Vec<String> = reference_entries.iter().map(|e| e.path.clone()).collect();
        let rule_entries = self
            .rules
            .evaluate(&RuleContext::new(&resolved, root))
            .into_iter()
            .filter(|entry| !failed.iter().any(|path| is_within(&entry.path, path)));

        let mut report: ValidationReport = reference_entries.into_iter().collect();
        report.extend(rule_entries);
        log::debug!(
            "Validation finished with {} errors and {} warnings",
            report.error_count(),
            report.warning_count()
        );

        if report.has_errors() {
            return Err(ResolveError::Invalid(report));
        }

        Ok(ResolvedConfig {
            value: Arc::new(resolved),
            provenance: Arc::new(provenance),
            warnings: report,
            root: self.options.root.clone(),
        })
    }
}

/// Resolve `fragments` with the default site rules
pub fn resolve(
    fragments: &[ConfigFragment],
    options: ResolveOptions,
) -> std::result::Result<ResolvedConfig, ResolveError> {
    Resolver::new(options).resolve(fragments)
}

/// Merge fragments in order, recording the winning source of every leaf
fn merge_fragments(fragments: &[ConfigFragment]) -> (Value, Provenance) {
    let mut merged = Value::mapping();
    let mut provenance = Provenance::new();
    for fragment in fragments {
        log::trace!("Merging fragment '{}'", fragment.source_id());
        merged.merge_tracking(
            fragment.values().clone(),
            fragment.source_id(),
            "",
            &mut provenance,
        );
    }
    (merged, provenance)
}

/// The effective configuration produced by one resolution pass
///
/// Immutable and cheap to clone; clones share the underlying tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    value: Arc<Value>,
    provenance: Arc<Provenance>,
    warnings: ValidationReport,
    root: PathBuf,
}

impl ResolvedConfig {
    /// The whole resolved tree
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Get a resolved value by path
    pub fn get(&self, path: &str) -> Result<&Value> {
        self.value.get_path(path)
    }

    /// Get a resolved string value, with type coercion if needed
    pub fn get_string(&self, path: &str) -> Result<String> {
        let value = self.get(path)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(Error::type_coercion(path, "string", value.type_name())),
        }
    }

    /// Get a resolved integer value, with type coercion if needed
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.get(path)?;
        match value {
            Value::Integer(i) => Ok(*i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "integer", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "integer", value.type_name())),
        }
    }

    /// Get a resolved boolean value
    ///
    /// Strings are accepted only when they read "true" or "false".
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.get(path)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::type_coercion(
                    path,
                    "boolean",
                    format!("string (\"{}\") - only \"true\" or \"false\" allowed", s),
                )),
            },
            _ => Err(Error::type_coercion(path, "boolean", value.type_name())),
        }
    }

    /// Winning source id for every leaf option path
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Source id that supplied the value at `path`
    ///
    /// Paths inside a sequence report the source of the whole sequence.
    pub fn source_of(&self, path: &str) -> Option<&str> {
        if let Some(source) = self.provenance.get(path) {
            return Some(source);
        }
        self.provenance
            .iter()
            .find(|(leaf, _)| crate::value::is_within(path, leaf))
            .map(|(_, source)| source.as_str())
    }

    /// Warnings produced by the pass
    pub fn warnings(&self) -> &ValidationReport {
        &self.warnings
    }

    /// Project root the pass resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Export the resolved tree as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self.value.as_ref()).map_err(|e| Error::parse(e.to_string()))
    }

    /// Export the resolved tree as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self.value.as_ref()).map_err(|e| Error::parse(e.to_string()))
    }

    /// Take the resolved tree out of this config
    pub fn into_value(self) -> Value {
        Arc::try_unwrap(self.value).unwrap_or_else(|shared| (*shared).clone())
    }
}
