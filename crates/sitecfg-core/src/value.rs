//! Configuration value types
//!
//! Represents configuration trees as supplied by fragments and as produced by
//! a resolution pass. Values can be scalars (string, int, float, bool, null),
//! sequences (arrays), or mappings (objects).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Provenance;
use crate::error::{Error, Result};

/// A configuration value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
#[derive(Default)]
pub enum Value {
    /// Null value; inside a fragment mapping it marks the key for removal
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain references like ${path:./sidebars.js})
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// Create an empty mapping
    pub fn mapping() -> Self {
        Value::Mapping(IndexMap::new())
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a boolean
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Check if this value is an integer
    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    /// Check if this value is a float
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get a value by path (e.g., "themeConfig.logo.src" or "presets[0][1].docs")
    pub fn get_path(&self, path: &str) -> Result<&Value> {
        if path.is_empty() {
            return Ok(self);
        }

        let segments = parse_path(path)?;
        let mut current = self;

        for segment in &segments {
            current = match segment {
                PathSegment::Key(key) => match current {
                    Value::Mapping(map) => map
                        .get(key.as_str())
                        .ok_or_else(|| Error::path_not_found(path))?,
                    _ => return Err(Error::path_not_found(path)),
                },
                PathSegment::Index(idx) => match current {
                    Value::Sequence(seq) => {
                        seq.get(*idx).ok_or_else(|| Error::path_not_found(path))?
                    }
                    _ => return Err(Error::path_not_found(path)),
                },
            };
        }

        Ok(current)
    }

    /// Get a value by path, treating absence as `None`
    ///
    /// Malformed paths are also reported as `None`; rules use this to skip
    /// options that were never set.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.get_path(path).ok()
    }

    /// Set a value at a path, creating intermediate mappings as needed
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        if path.is_empty() {
            *self = value;
            return Ok(());
        }

        let segments = parse_path(path)?;
        if segments.is_empty() {
            return Err(Error::parse(format!("Path '{}' names no option", path)));
        }
        let mut current = self;

        for (i, segment) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;

            if is_last {
                match segment {
                    PathSegment::Key(key) => {
                        if let Value::Mapping(map) = current {
                            map.insert(key.clone(), value);
                            return Ok(());
                        }
                        return Err(Error::path_not_found(path));
                    }
                    PathSegment::Index(idx) => {
                        if let Value::Sequence(seq) = current {
                            if let Some(slot) = seq.get_mut(*idx) {
                                *slot = value;
                                return Ok(());
                            }
                        }
                        return Err(Error::path_not_found(path));
                    }
                }
            }

            // Navigate to next level, creating mappings if needed
            current = match segment {
                PathSegment::Key(key) => {
                    if let Value::Mapping(map) = current {
                        let next_is_index =
                            matches!(segments.get(i + 1), Some(PathSegment::Index(_)));
                        map.entry(key.clone()).or_insert_with(|| {
                            if next_is_index {
                                Value::Sequence(vec![])
                            } else {
                                Value::mapping()
                            }
                        })
                    } else {
                        return Err(Error::path_not_found(path));
                    }
                }
                PathSegment::Index(idx) => {
                    if let Value::Sequence(seq) = current {
                        seq.get_mut(*idx)
                            .ok_or_else(|| Error::path_not_found(path))?
                    } else {
                        return Err(Error::path_not_found(path));
                    }
                }
            };
        }

        Ok(())
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Expand dotted mapping keys into nested mappings
    ///
    /// `{"themeConfig.prism.theme": "github"}` becomes
    /// `{themeConfig: {prism: {theme: "github"}}}`. Keys that expand into the
    /// same mapping are combined; for the same leaf the later key wins.
    pub fn expand_dotted_keys(self) -> Value {
        match self {
            Value::Mapping(map) => {
                let mut expanded = IndexMap::new();
                for (key, value) in map {
                    let value = value.expand_dotted_keys();
                    let segments: Vec<&str> = key.split('.').collect();
                    if segments.iter().any(|s| s.is_empty()) {
                        insert_nested(&mut expanded, &[key.as_str()], value);
                    } else {
                        insert_nested(&mut expanded, &segments, value);
                    }
                }
                Value::Mapping(expanded)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Value::expand_dotted_keys).collect())
            }
            other => other,
        }
    }

    /// Drop removal markers (null mapping entries) from this tree
    ///
    /// Nulls inside sequences are data, not markers, and are kept.
    pub fn without_removals(self) -> Value {
        match self {
            Value::Mapping(map) => Value::Mapping(
                map.into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k, v.without_removals()))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Merge a higher-precedence value into this one, tracking provenance
    ///
    /// Merge semantics:
    /// - Mappings: deep merge recursively
    /// - Scalars: `overlay` wins (last-writer-wins)
    /// - Sequences: `overlay` replaces entirely
    /// - Null in overlay mapping: removes the key and everything below it
    /// - Type mismatch: `overlay` wins
    ///
    /// `provenance` maps each leaf path (scalar, sequence or empty mapping) to
    /// the source id that supplied it.
    pub(crate) fn merge_tracking(
        &mut self,
        overlay: Value,
        source: &str,
        path: &str,
        provenance: &mut Provenance,
    ) {
        match (self, overlay) {
            (Value::Mapping(base), Value::Mapping(overlay)) => {
                for (key, overlay_value) in overlay {
                    let key_path = child_path(path, &key);
                    if overlay_value.is_null() {
                        base.shift_remove(&key);
                        forget_subtree(provenance, &key_path);
                    } else if let Some(base_value) = base.get_mut(&key) {
                        base_value.merge_tracking(overlay_value, source, &key_path, provenance);
                    } else {
                        let value = overlay_value.without_removals();
                        value.record_leaves(source, &key_path, provenance);
                        base.insert(key, value);
                    }
                }

                if !path.is_empty() {
                    if base.is_empty() {
                        provenance.insert(path.to_string(), source.to_string());
                    } else {
                        provenance.shift_remove(path);
                    }
                }
            }
            (this, other) => {
                forget_subtree(provenance, path);
                let value = other.without_removals();
                value.record_leaves(source, path, provenance);
                *this = value;
            }
        }
    }

    /// Record `source` as the provenance of every leaf below `path`
    pub(crate) fn record_leaves(&self, source: &str, path: &str, provenance: &mut Provenance) {
        match self {
            Value::Mapping(map) if !map.is_empty() => {
                for (key, value) in map {
                    value.record_leaves(source, &child_path(path, key), provenance);
                }
            }
            _ => {
                if !path.is_empty() {
                    provenance.insert(path.to_string(), source.to_string());
                }
            }
        }
    }
}

/// Insert `value` below `segments`, combining with mappings already present
fn insert_nested(map: &mut IndexMap<String, Value>, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        let combine = matches!(
            (map.get(*first), &value),
            (Some(Value::Mapping(_)), Value::Mapping(_))
        );
        if combine {
            if let (Some(Value::Mapping(existing)), Value::Mapping(incoming)) =
                (map.get_mut(*first), value)
            {
                for (key, v) in incoming {
                    insert_nested(existing, &[key.as_str()], v);
                }
            }
        } else {
            map.insert((*first).to_string(), value);
        }
        return;
    }

    let entry = map
        .entry((*first).to_string())
        .or_insert_with(Value::mapping);
    if !entry.is_mapping() {
        *entry = Value::mapping();
    }
    if let Value::Mapping(inner) = entry {
        insert_nested(inner, rest, value);
    }
}

/// Remove `path` and every path below it from the provenance map
fn forget_subtree(provenance: &mut Provenance, path: &str) {
    provenance.retain(|candidate, _| !is_within(candidate, path));
}

/// Whether `candidate` is `path` itself or a path nested below it
pub(crate) fn is_within(candidate: &str, path: &str) -> bool {
    if path.is_empty() {
        return true;
    }
    match candidate.strip_prefix(path) {
        Some("") => true,
        Some(rest) => rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}

/// Join a mapping key onto a parent path
pub(crate) fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Join a sequence index onto a parent path
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

/// A segment in a path expression
#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    /// A key in a mapping (e.g., "themeConfig" in "themeConfig.prism")
    Key(String),
    /// An index in a sequence (e.g., 0 in "plugins[0]")
    Index(usize),
}

/// Parse a path string into segments
/// Supports: "key", "key.subkey", "key[0]", "key[0].subkey", "key[0][1]"
fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut after_dot = false;
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                } else if segments.is_empty() || after_dot {
                    return Err(empty_segment(path));
                }
                after_dot = true;
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                } else if after_dot {
                    return Err(empty_segment(path));
                }
                after_dot = false;
                let mut index_str = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    index_str.push(c);
                }
                if !closed {
                    return Err(Error::parse(format!("Unclosed '[' in path: {}", path)));
                }
                let idx: usize = index_str.parse().map_err(|_| {
                    Error::parse(format!("Invalid array index in path: {}", index_str))
                })?;
                segments.push(PathSegment::Index(idx));
            }
            ']' => {
                return Err(Error::parse("Unexpected ']' in path"));
            }
            _ => {
                current_key.push(c);
                after_dot = false;
            }
        }
    }

    if after_dot {
        return Err(empty_segment(path));
    }
    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    }

    Ok(segments)
}

fn empty_segment(path: &str) -> Error {
    Error::parse(format!("Empty segment in path: '{}'", path))
}
