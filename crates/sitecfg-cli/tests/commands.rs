//! Runs the `sitecfg` binary against fixture sites

use std::path::Path;

use assert_cmd::Command;

const SITE: &str = r#"
title: Ionic Enterprise Tutorials
url: https://ionic.io
baseUrl: /docs/tutorials/
onBrokenLinks: throw
presets:
  - - classic
    - docs:
        sidebarPath: ${path:./sidebars.js}
"#;

fn sitecfg() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sitecfg"));
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("docusaurus.yaml"), SITE).unwrap();
    std::fs::write(dir.path().join("sidebars.js"), "module.exports = {};").unwrap();
    dir
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    String::from_utf8(output.stdout).unwrap()
}

fn site_file(dir: &Path) -> String {
    dir.join("docusaurus.yaml").display().to_string()
}

#[test]
fn validate_accepts_a_valid_site() {
    let dir = fixture();
    sitecfg()
        .args(["validate", &site_file(dir.path())])
        .assert()
        .success();
}

#[test]
fn validate_reports_invalid_overrides_as_json() {
    let dir = fixture();
    let output = sitecfg()
        .args([
            "validate",
            &site_file(dir.path()),
            "--set",
            "onBrokenLinks=explode",
            "--format",
            "json",
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["entries"][0]["rule"], "on-broken-links");
}

#[test]
fn missing_file_is_an_input_error() {
    let dir = fixture();
    sitecfg()
        .args(["validate", &dir.path().join("nope.yaml").display().to_string()])
        .assert()
        .code(2);
}

#[test]
fn get_prints_resolved_values() {
    let dir = fixture();
    let sidebar = stdout_of(sitecfg().args([
        "get",
        &site_file(dir.path()),
        "presets[0][1].docs.sidebarPath",
    ]));
    assert!(sidebar.trim_end().ends_with("sidebars.js"));
    assert!(Path::new(sidebar.trim_end()).is_absolute());

    let fallback = stdout_of(sitecfg().args([
        "get",
        &site_file(dir.path()),
        "themeConfig.prism.theme",
        "--default",
        "github",
    ]));
    assert_eq!(fallback, "github\n");
}

#[test]
fn dump_sources_lists_provenance() {
    let dir = fixture();
    let file = site_file(dir.path());
    let output = stdout_of(sitecfg().args([
        "dump",
        &file,
        "--set",
        "trailingSlash=false",
        "--sources",
        "--format",
        "json",
    ]));

    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["title"], file.as_str());
    assert_eq!(json["trailingSlash"], "cli");
}

#[test]
fn check_reports_syntax_errors() {
    let dir = fixture();
    let broken = dir.path().join("broken.yaml");
    std::fs::write(&broken, "title: [unclosed").unwrap();

    sitecfg()
        .args(["check", &site_file(dir.path()), &broken.display().to_string()])
        .assert()
        .code(1);
}

#[test]
fn check_missing_file_is_an_input_error() {
    let dir = fixture();
    sitecfg()
        .args(["check", &dir.path().join("nope.yaml").display().to_string()])
        .assert()
        .code(2);
}

#[test]
fn validate_applies_a_schema() {
    let dir = fixture();
    let schema = dir.path().join("schema.json");
    std::fs::write(&schema, r#"{"type": "object", "required": ["tagline"]}"#).unwrap();

    let output = sitecfg()
        .args([
            "validate",
            &site_file(dir.path()),
            "--schema",
            &schema.display().to_string(),
            "--format",
            "json",
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let rules: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["rule"].as_str())
        .collect();
    assert_eq!(rules, vec!["schema"]);

    sitecfg()
        .args([
            "validate",
            &site_file(dir.path()),
            "--schema",
            &schema.display().to_string(),
            "--set",
            "tagline=Learn Ionic",
        ])
        .assert()
        .success();
}

#[test]
fn validate_quiet_prints_nothing_when_valid() {
    let dir = fixture();
    let output = sitecfg()
        .args(["validate", "--quiet", &site_file(dir.path())])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(output.is_empty());
}

#[test]
fn dump_writes_yaml_to_output_file() {
    let dir = fixture();
    let target = dir.path().join("resolved.yaml");
    sitecfg()
        .args([
            "dump",
            &site_file(dir.path()),
            "--output",
            &target.display().to_string(),
        ])
        .assert()
        .success();

    let dumped: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(dumped["title"], "Ionic Enterprise Tutorials");
    assert_eq!(dumped["onBrokenLinks"], "throw");
    let sidebar = dumped["presets"][0][1]["docs"]["sidebarPath"].as_str().unwrap();
    assert_eq!(
        Path::new(sidebar),
        dir.path().join("sidebars.js").as_path()
    );
}

#[test]
fn get_renders_json_and_yaml() {
    let dir = fixture();
    let file = site_file(dir.path());

    let json = stdout_of(sitecfg().args(["get", &file, "presets[0][1]", "--format", "json"]));
    let json: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(json["docs"]["sidebarPath"].is_string());

    let yaml = stdout_of(sitecfg().args(["get", &file, "baseUrl", "--format", "yaml"]));
    let yaml: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(yaml, "/docs/tutorials/");
}

#[test]
fn schema_validate_exit_codes() {
    let dir = fixture();
    let good = dir.path().join("good.json");
    let broken = dir.path().join("broken.json");
    std::fs::write(&good, r#"{"type": "object"}"#).unwrap();
    std::fs::write(&broken, "{").unwrap();

    sitecfg()
        .args(["schema", "validate", &good.display().to_string()])
        .assert()
        .success();
    sitecfg()
        .args(["schema", "validate", &broken.display().to_string()])
        .assert()
        .code(1);
    sitecfg()
        .args([
            "schema",
            "validate",
            &dir.path().join("missing.json").display().to_string(),
        ])
        .assert()
        .code(2);
}
