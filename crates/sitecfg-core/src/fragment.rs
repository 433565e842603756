//! Configuration fragments
//!
//! A fragment is one named, partial source of configuration: built-in
//! defaults, a site file, command-line overrides. Fragments are immutable once
//! built and are merged in order by the resolver.

use std::path::Path;

use crate::error::{Error, Result, SourceLocation};
use crate::value::Value;

/// One named source of partial configuration values
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragment {
    source_id: String,
    values: Value,
}

impl ConfigFragment {
    /// Create a fragment from a value tree
    ///
    /// The tree must be a mapping. Dotted keys are expanded into nested
    /// mappings, so `{"themeConfig.prism.theme": "github"}` and the nested
    /// form are equivalent.
    pub fn new(source_id: impl Into<String>, values: Value) -> Result<Self> {
        let source_id = source_id.into();
        if source_id.trim().is_empty() {
            return Err(Error::invalid_fragment(
                "<unnamed>",
                "fragment source id must not be empty",
            ));
        }
        if !values.is_mapping() {
            return Err(Error::invalid_fragment(
                &source_id,
                format!(
                    "fragment root must be a mapping, got {}",
                    values.type_name()
                ),
            ));
        }

        Ok(Self {
            values: values.expand_dotted_keys(),
            source_id,
        })
    }

    /// Create a fragment from a YAML document
    pub fn from_yaml(source_id: impl Into<String>, yaml: &str) -> Result<Self> {
        let source_id = source_id.into();
        let values = parse_yaml(yaml, &source_id)?;
        Self::new(source_id, values)
    }

    /// Create a fragment from a JSON document
    pub fn from_json(source_id: impl Into<String>, json: &str) -> Result<Self> {
        let source_id = source_id.into();
        let values: Value = serde_json::from_str(json).map_err(|e| {
            Error::parse(e.to_string()).with_source_location(SourceLocation {
                file: source_id.clone(),
                line: Some(e.line()),
                column: Some(e.column()),
            })
        })?;
        Self::new(source_id, values)
    }

    /// Load a fragment from a file, using the path as the source id
    ///
    /// `.json` files are parsed as JSON; everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_id = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(source_id.clone(), e.to_string()))?;

        log::debug!("Loaded fragment source '{}'", source_id);

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(source_id, &content),
            _ => Self::from_yaml(source_id, &content),
        }
    }

    /// Create a fragment from `path=value` assignments
    ///
    /// Values are parsed as YAML scalars or flow collections, so `false`
    /// becomes a boolean and `[a, b]` a sequence. An empty value is an empty
    /// string.
    pub fn from_assignments<S: AsRef<str>>(
        source_id: impl Into<String>,
        assignments: &[S],
    ) -> Result<Self> {
        let source_id = source_id.into();
        let mut values = Value::mapping();

        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (path, raw) = assignment.split_once('=').ok_or_else(|| {
                Error::invalid_fragment(
                    &source_id,
                    format!("expected PATH=VALUE, got '{}'", assignment),
                )
            })?;
            let path = path.trim();
            if path.is_empty() {
                return Err(Error::invalid_fragment(
                    &source_id,
                    format!("missing option path in '{}'", assignment),
                ));
            }

            let value = if raw.is_empty() {
                Value::String(String::new())
            } else {
                parse_yaml(raw, &source_id)?
            };
            values.set_path(path, value).map_err(|e| e.with_path(path))?;
        }

        Self::new(source_id, values)
    }

    /// The unique name of this fragment
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// The (expanded) values supplied by this fragment
    pub fn values(&self) -> &Value {
        &self.values
    }
}

fn parse_yaml(yaml: &str, source_id: &str) -> Result<Value> {
    serde_yaml::from_str(yaml).map_err(|e| {
        let location = e.location();
        Error::parse(e.to_string()).with_source_location(SourceLocation {
            file: source_id.to_string(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_yaml() {
        let fragment = ConfigFragment::from_yaml(
            "base",
            r#"
title: Ionic Enterprise Tutorials
trailingSlash: false
"#,
        )
        .unwrap();

        assert_eq!(fragment.source_id(), "base");
        assert_eq!(
            fragment.values().get_path("trailingSlash").unwrap().as_bool(),
            Some(false)
        );
    }

    #[test]
    fn test_from_json_expands_dotted_keys() {
        let fragment = ConfigFragment::from_json(
            "overrides",
            r#"{"themeConfig.prism.theme": "github", "themeConfig.logo.height": 24}"#,
        )
        .unwrap();

        assert_eq!(
            fragment
                .values()
                .get_path("themeConfig.prism.theme")
                .unwrap()
                .as_str(),
            Some("github")
        );
        assert_eq!(
            fragment
                .values()
                .get_path("themeConfig.logo.height")
                .unwrap()
                .as_i64(),
            Some(24)
        );
    }

    #[test]
    fn test_root_must_be_mapping() {
        let err = ConfigFragment::from_yaml("list", "- a\n- b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFragment);
        assert!(err.to_string().contains("got sequence"));
    }

    #[test]
    fn test_source_id_must_not_be_empty() {
        let err = ConfigFragment::new("  ", Value::mapping()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFragment);
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = ConfigFragment::from_yaml("broken.yaml", "title: [unclosed").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
        let location = err.source_location.unwrap();
        assert_eq!(location.file, "broken.yaml");
        assert!(location.line.is_some());
    }

    #[test]
    fn test_from_assignments() {
        let fragment = ConfigFragment::from_assignments(
            "cli",
            &[
                "trailingSlash=true",
                "themeConfig.prism.theme=dracula",
                "plugins=[docusaurus-plugin-image-zoom]",
                "titleDelimiter=",
            ],
        )
        .unwrap();

        let values = fragment.values();
        assert_eq!(values.get_path("trailingSlash").unwrap().as_bool(), Some(true));
        assert_eq!(
            values.get_path("themeConfig.prism.theme").unwrap().as_str(),
            Some("dracula")
        );
        assert_eq!(
            values.get_path("plugins[0]").unwrap().as_str(),
            Some("docusaurus-plugin-image-zoom")
        );
        assert_eq!(values.get_path("titleDelimiter").unwrap().as_str(), Some(""));
    }

    #[test]
    fn test_from_assignments_rejects_missing_equals() {
        let err = ConfigFragment::from_assignments("cli", &["trailingSlash"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFragment);
        assert!(err.to_string().contains("expected PATH=VALUE"));

        for assignment in [".=x", "title..=y", ".title=z"] {
            let err = ConfigFragment::from_assignments("cli", &[assignment]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Parse);
            assert!(err.to_string().contains("Empty segment"));
        }
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("site.yaml");
        let json_path = dir.path().join("site.json");
        std::fs::write(&yaml_path, "title: From YAML\n").unwrap();
        std::fs::write(&json_path, r#"{"title": "From JSON"}"#).unwrap();

        let from_yaml = ConfigFragment::from_file(&yaml_path).unwrap();
        let from_json = ConfigFragment::from_file(&json_path).unwrap();

        assert_eq!(from_yaml.source_id(), yaml_path.display().to_string());
        assert_eq!(
            from_yaml.values().get_path("title").unwrap().as_str(),
            Some("From YAML")
        );
        assert_eq!(
            from_json.values().get_path("title").unwrap().as_str(),
            Some("From JSON")
        );
    }

    #[test]
    fn test_from_file_missing() {
        let err = ConfigFragment::from_file("/definitely/not/here.yaml").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }
}
