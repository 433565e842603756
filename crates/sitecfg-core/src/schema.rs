//! JSON Schema support for site configuration
//!
//! A schema is checked against the merged tree after references are resolved.
//! Every violation is collected; instance paths are reported in the same
//! dotted form used everywhere else (`presets[0][1].docs`).

use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::{child_path, index_path, Value};

/// Schema for validating configuration
#[derive(Debug, Clone)]
pub struct Schema {
    /// The JSON Schema as a serde_json::Value
    schema: serde_json::Value,
    /// Compiled JSON Schema validator (wrapped in Arc for Clone)
    compiled: Arc<jsonschema::Validator>,
}

impl Schema {
    /// Load a schema from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::parse(format!("Invalid JSON schema: {}", e)))?;
        Self::from_value(schema)
    }

    /// Load a schema from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let schema: serde_json::Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::parse(format!("Invalid YAML schema: {}", e)))?;
        Self::from_value(schema)
    }

    /// Load a schema from a file (JSON or YAML based on extension)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(file.clone(), e.to_string()))?;

        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        };
        parsed.map_err(|e| {
            e.with_source_location(crate::error::SourceLocation {
                file,
                line: None,
                column: None,
            })
        })
    }

    /// Compile a schema from a serde_json::Value
    pub fn from_value(schema: serde_json::Value) -> Result<Self> {
        let compiled = jsonschema::validator_for(&schema)
            .map_err(|e| Error::parse(format!("Invalid JSON Schema: {}", e)))?;
        Ok(Self {
            schema,
            compiled: Arc::new(compiled),
        })
    }

    /// Collect every violation of this schema in `value`
    pub fn violations(&self, value: &Value) -> Vec<SchemaViolation> {
        let json_value = value_to_json(value);

        self.compiled
            .iter_errors(&json_value)
            .map(|e| SchemaViolation {
                path: pointer_to_path(&e.instance_path.to_string(), value),
                message: e.to_string(),
            })
            .collect()
    }

    /// Whether `value` satisfies this schema
    pub fn is_valid(&self, value: &Value) -> bool {
        self.compiled.is_valid(&value_to_json(value))
    }

    /// Get the raw schema value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.schema
    }
}

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the invalid value; empty for the root
    pub path: String,
    /// Message produced by the schema validator
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Convert a JSON pointer (`/presets/0/1/docs`) into a dotted option path
///
/// Numeric segments become indexes only where the tree holds a sequence, so a
/// mapping key named `0` stays a key.
fn pointer_to_path(pointer: &str, value: &Value) -> String {
    let mut path = String::new();
    let mut current = Some(value);

    for raw in pointer.split('/').skip(1) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        match (current, segment.parse::<usize>()) {
            (Some(Value::Sequence(seq)), Ok(idx)) => {
                path = index_path(&path, idx);
                current = seq.get(idx);
            }
            (Some(Value::Mapping(map)), _) => {
                current = map.get(&segment);
                path = child_path(&path, &segment);
            }
            _ => {
                current = None;
                path = child_path(&path, &segment);
            }
        }
    }

    path
}

/// Convert a configuration Value to serde_json::Value
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(value_to_json).collect()),
        Value::Mapping(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            serde_json::Value::Object(obj)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn site_schema() -> Schema {
        Schema::from_yaml(
            r#"
type: object
required: [title, url]
properties:
  title:
    type: string
  url:
    type: string
  trailingSlash:
    type: boolean
  themeConfig:
    type: object
    properties:
      logo:
        type: object
        properties:
          height:
            type: integer
            minimum: 1
  presets:
    type: array
    items:
      type: array
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_schema_from_json() {
        let schema = Schema::from_json(r#"{"type": "object"}"#).unwrap();
        assert!(schema.as_value().is_object());
        assert!(schema.is_valid(&Value::mapping()));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        assert!(Schema::from_json("{not json").is_err());
        assert!(Schema::from_yaml("type: 12").is_err());
    }

    #[test]
    fn test_valid_config_has_no_violations() {
        let config = yaml(
            r#"
title: Ionic Enterprise Tutorials
url: https://ionic.io
trailingSlash: false
presets:
  - [classic, {docs: {}}]
"#,
        );
        assert_eq!(site_schema().violations(&config), vec![]);
    }

    #[test]
    fn test_violations_are_collected() {
        let config = yaml("trailingSlash: 'no'");
        let violations = site_schema().violations(&config);

        assert!(violations.len() >= 2);
        assert!(violations.iter().any(|v| v.path.is_empty() && v.message.contains("title")));
        assert!(violations.iter().any(|v| v.path == "trailingSlash"));
    }

    #[test]
    fn test_violation_paths_are_dotted() {
        let config = yaml(
            r#"
title: Site
url: https://ionic.io
themeConfig:
  logo:
    height: 0
presets:
  - classic
"#,
        );
        let mut paths: Vec<String> = site_schema()
            .violations(&config)
            .into_iter()
            .map(|v| v.path)
            .collect();
        paths.sort();

        assert_eq!(paths, vec!["presets[0]", "themeConfig.logo.height"]);
    }

    #[test]
    fn test_pointer_to_path_keeps_numeric_keys() {
        let value = yaml("versions:\n  '0': {label: legacy}\nlist: [a, {b: 1}]");
        assert_eq!(pointer_to_path("/versions/0/label", &value), "versions.0.label");
        assert_eq!(pointer_to_path("/list/1/b", &value), "list[1].b");
        assert_eq!(pointer_to_path("/a~1b", &value), "a/b");
        assert_eq!(pointer_to_path("", &value), "");
    }

    #[test]
    fn test_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.schema.json");
        std::fs::write(&path, r#"{"type": "object", "required": ["title"]}"#).unwrap();

        let schema = Schema::from_file(&path).unwrap();
        assert!(!schema.is_valid(&Value::mapping()));

        let err = Schema::from_file(dir.path().join("missing.yaml")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Io);
    }
}
