//! Reference expressions inside option values
//!
//! Supported forms:
//! - `${path:./sidebars.js}` - a file resolved against the project root
//! - `${path:@code-hike/mdx/styles.css}` - falls back to `<root>/node_modules`
//! - `${ref:themeConfig.logo.src}` - the value of another option
//! - `${baseUrl}` - shorthand for `${ref:baseUrl}`
//! - `\${escaped}` - a literal `${`
//!
//! References are resolved once, right after merging. Failures never abort
//! the pass; each one becomes a validation entry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::report::{Severity, ValidationEntry};
use crate::value::{child_path, index_path, Value};

/// Rule name used for references that cannot be resolved
pub const UNRESOLVABLE_REFERENCE: &str = "unresolvable-reference";

/// Rule name used for references that form a cycle
pub const CIRCULAR_REFERENCE: &str = "circular-reference";

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A file relative to the project root
    Path,
    /// Another option in the same configuration
    Ref,
}

impl ReferenceKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "path" => Some(ReferenceKind::Path),
            "ref" => Some(ReferenceKind::Ref),
            _ => None,
        }
    }
}

/// A parsed string value
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Plain text (escapes already removed)
    Literal(String),
    /// A single reference
    Reference { kind: ReferenceKind, target: String },
    /// Text and references joined together
    Concat(Vec<Expression>),
}

/// Check if a string needs parsing (contains references or escapes)
pub fn needs_processing(input: &str) -> bool {
    input.contains("${")
}

/// Parse a string value into an expression
pub fn parse(input: &str) -> Result<Expression> {
    ExpressionParser::new(input).parse()
}

struct ExpressionParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ExpressionParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse(&mut self) -> Result<Expression> {
        let mut parts: Vec<Expression> = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.current() {
            if self.at_escape() {
                // \${ -> literal ${
                self.pos += 3;
                literal.push_str("${");
            } else if self.at_reference_start() {
                if !literal.is_empty() {
                    parts.push(Expression::Literal(std::mem::take(&mut literal)));
                }
                parts.push(self.parse_reference()?);
            } else {
                literal.push(c);
                self.pos += c.len_utf8();
            }
        }

        if !literal.is_empty() {
            parts.push(Expression::Literal(literal));
        }

        Ok(match parts.len() {
            0 => Expression::Literal(String::new()),
            1 => parts.remove(0),
            _ => Expression::Concat(parts),
        })
    }

    fn current(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn at_escape(&self) -> bool {
        self.rest().starts_with("\\${")
    }

    fn at_reference_start(&self) -> bool {
        self.rest().starts_with("${")
    }

    /// Parse `${kind:target}` or `${option.path}`, starting at `${`
    fn parse_reference(&mut self) -> Result<Expression> {
        self.pos += 2;
        let body_start = self.pos;

        let Some(close) = self.rest().find('}') else {
            return Err(Error::parse(format!(
                "Unclosed reference in '{}'",
                self.input
            )));
        };
        let body = self.input[body_start..body_start + close].trim();
        self.pos = body_start + close + 1;

        if body.is_empty() {
            return Err(Error::parse("Empty reference expression"));
        }
        if body.contains("${") {
            return Err(Error::parse(format!(
                "Nested references are not supported: '{}'",
                body
            )));
        }

        match body.split_once(':') {
            Some((name, target)) => {
                let name = name.trim();
                let target = target.trim();
                let kind = ReferenceKind::from_name(name).ok_or_else(|| {
                    Error::parse(format!("Unknown reference kind '{}'", name))
                        .with_help("Use ${path:...} for files or ${ref:...} for options")
                })?;
                if target.is_empty() {
                    return Err(Error::parse(format!(
                        "Reference '{}' has an empty target",
                        name
                    )));
                }
                Ok(Expression::Reference {
                    kind,
                    target: target.to_string(),
                })
            }
            None => {
                if !body
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']'))
                {
                    return Err(Error::parse(format!(
                        "Invalid option path '{}' in reference",
                        body
                    )));
                }
                Ok(Expression::Reference {
                    kind: ReferenceKind::Ref,
                    target: body.to_string(),
                })
            }
        }
    }
}

/// Why a single reference could not be resolved
#[derive(Clone)]
enum Failure {
    Unresolvable(String),
    Circular(Vec<String>),
}

impl Failure {
    fn into_entry(self, path: &str) -> ValidationEntry {
        match self {
            Failure::Unresolvable(message) => {
                ValidationEntry::new(UNRESOLVABLE_REFERENCE, path, Severity::Error, message)
            }
            Failure::Circular(chain) => ValidationEntry::new(
                CIRCULAR_REFERENCE,
                path,
                Severity::Error,
                format!("circular reference: {}", chain.join(" → ")),
            ),
        }
    }
}

/// Resolve every reference in `tree`
///
/// Returns the resolved tree and one entry per failed reference. A value
/// whose reference failed keeps its original text.
pub fn resolve_references(tree: &Value, root: &Path) -> (Value, Vec<ValidationEntry>) {
    let resolver = ReferenceResolver {
        tree,
        root,
        cache: RefCell::new(HashMap::new()),
    };
    let mut entries = Vec::new();
    let resolved = resolver.walk(tree, "", &mut entries);
    (resolved, entries)
}

struct ReferenceResolver<'a> {
    tree: &'a Value,
    root: &'a Path,
    // Resolved options for this pass. Circular failures depend on the
    // resolution stack and are never cached.
    cache: RefCell<HashMap<String, std::result::Result<Value, Failure>>>,
}

impl ReferenceResolver<'_> {
    /// Resolve a subtree, recording failures instead of propagating them
    fn walk(&self, value: &Value, path: &str, entries: &mut Vec<ValidationEntry>) -> Value {
        match value {
            Value::String(s) if needs_processing(s) => {
                let mut stack = Vec::new();
                match self.evaluate_string(s, &mut stack) {
                    Ok(resolved) => resolved,
                    Err(failure) => {
                        entries.push(failure.into_entry(path));
                        value.clone()
                    }
                }
            }
            Value::Sequence(seq) => Value::Sequence(
                seq.iter()
                    .enumerate()
                    .map(|(i, item)| self.walk(item, &index_path(path, i), entries))
                    .collect(),
            ),
            Value::Mapping(map) => Value::Mapping(
                map.iter()
                    .map(|(key, item)| {
                        (key.clone(), self.walk(item, &child_path(path, key), entries))
                    })
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    fn evaluate_string(
        &self,
        input: &str,
        stack: &mut Vec<String>,
    ) -> std::result::Result<Value, Failure> {
        let expression = parse(input).map_err(|e| {
            Failure::Unresolvable(e.cause.unwrap_or_else(|| "invalid reference".into()))
        })?;
        self.evaluate(&expression, stack)
    }

    fn evaluate(
        &self,
        expression: &Expression,
        stack: &mut Vec<String>,
    ) -> std::result::Result<Value, Failure> {
        match expression {
            Expression::Literal(s) => Ok(Value::String(s.clone())),
            Expression::Reference {
                kind: ReferenceKind::Path,
                target,
            } => self
                .resolve_file(target)
                .map(|p| Value::String(p.display().to_string())),
            Expression::Reference {
                kind: ReferenceKind::Ref,
                target,
            } => self.resolve_option(target, stack),
            Expression::Concat(parts) => {
                let mut result = String::new();
                for part in parts {
                    match self.evaluate(part, stack)? {
                        Value::String(s) => result.push_str(&s),
                        other => result.push_str(&other.to_string()),
                    }
                }
                Ok(Value::String(result))
            }
        }
    }

    /// Resolve another option, following its own references
    fn resolve_option(
        &self,
        target: &str,
        stack: &mut Vec<String>,
    ) -> std::result::Result<Value, Failure> {
        if stack.iter().any(|p| p == target) {
            let mut chain = stack.clone();
            chain.push(target.to_string());
            return Err(Failure::Circular(chain));
        }

        if let Some(cached) = self.cache.borrow().get(target) {
            return cached.clone();
        }

        let result = match self.tree.lookup(target) {
            Some(referenced) => {
                stack.push(target.to_string());
                let result = self.resolve_nested(referenced, stack);
                stack.pop();
                result
            }
            None => Err(Failure::Unresolvable(format!(
                "referenced option '{}' does not exist",
                target
            ))),
        };

        if !matches!(result, Err(Failure::Circular(_))) {
            self.cache
                .borrow_mut()
                .insert(target.to_string(), result.clone());
        }
        result
    }

    fn resolve_nested(
        &self,
        value: &Value,
        stack: &mut Vec<String>,
    ) -> std::result::Result<Value, Failure> {
        match value {
            Value::String(s) if needs_processing(s) => self.evaluate_string(s, stack),
            Value::Sequence(seq) => seq
                .iter()
                .map(|item| self.resolve_nested(item, stack))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Mapping(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.resolve_nested(v, stack)?)))
                .collect::<std::result::Result<indexmap::IndexMap<_, _>, _>>()
                .map(Value::Mapping),
            _ => Ok(value.clone()),
        }
    }

    /// Resolve a file reference against the project root
    fn resolve_file(&self, target: &str) -> std::result::Result<PathBuf, Failure> {
        if target.contains('\0') {
            return Err(Failure::Unresolvable(
                "file paths cannot contain null bytes".into(),
            ));
        }

        let target_path = Path::new(target);
        let mut candidates = Vec::new();
        if target_path.is_absolute() {
            candidates.push(target_path.to_path_buf());
        } else if target.starts_with('.') {
            candidates.push(self.root.join(target_path));
        } else {
            candidates.push(self.root.join(target_path));
            candidates.push(self.root.join("node_modules").join(target_path));
        }

        for candidate in &candidates {
            let normalized = normalize_lexically(candidate);
            if normalized.exists() {
                log::trace!("Resolved path reference '{}' to {}", target, normalized.display());
                return Ok(normalized);
            }
        }

        let tried: Vec<String> = candidates
            .iter()
            .map(|c| normalize_lexically(c).display().to_string())
            .collect();
        Err(Failure::Unresolvable(format!(
            "cannot resolve '{}' (tried {})",
            target,
            tried.join(", ")
        )))
    }
}

/// Remove `.` and `..` components without touching the filesystem
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
