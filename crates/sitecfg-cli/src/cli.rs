//! sitecfg CLI - Command-line interface for site configuration
//!
//! Usage:
//!   sitecfg validate docusaurus.yaml --set trailingSlash=true
//!   sitecfg dump defaults.yaml docusaurus.yaml --format json
//!   sitecfg get docusaurus.yaml themeConfig.prism.theme

use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use sitecfg_core::{
    ConfigFragment, Error, ErrorKind, ResolveError, ResolveOptions, ResolvedConfig, Resolver,
    Schema, Severity, ValidationEntry, ValidationReport, Value,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Source id of the `--set` fragment
const CLI_SOURCE_ID: &str = "cli";

/// sitecfg - Resolve and validate static-site configuration
#[derive(Parser)]
#[command(name = "sitecfg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs a resolution pass
#[derive(Args)]
struct ResolveArgs {
    /// Project root for path references and file checks
    /// (default: directory of the last configuration file)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Override an option, e.g. --set themeConfig.prism.theme=dracula
    #[arg(long = "set", value_name = "PATH=VALUE")]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve configuration files and report every problem found
    Validate {
        /// Configuration file(s), lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Also check the resolved configuration against a JSON Schema
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Output format: text, json
        #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Only output problems (quiet mode)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the resolved configuration
    Dump {
        /// Configuration file(s), lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Also check the resolved configuration against a JSON Schema
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Output format: yaml, json
        #[arg(short, long, default_value = "yaml", value_parser = ["yaml", "json"])]
        format: String,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show the source of each option instead of values
        #[arg(long)]
        sources: bool,
    },

    /// Get a specific value from the resolved configuration
    Get {
        /// Configuration file(s), lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to the value (e.g., themeConfig.logo.src)
        path: String,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text", value_parser = ["text", "json", "yaml"])]
        format: String,

        /// Default value if key not found
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Quick syntax check without resolution or validation
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Schema-related utilities
    #[command(name = "schema")]
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Validate that a schema file is valid JSON Schema
    Validate {
        /// Schema file to validate
        #[arg(required = true)]
        file: PathBuf,
    },
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Validate {
            files,
            resolve,
            schema,
            format,
            quiet,
        } => cmd_validate(&files, &resolve, schema.as_deref(), &format, quiet),

        Commands::Dump {
            files,
            resolve,
            schema,
            format,
            output,
            sources,
        } => cmd_dump(&files, &resolve, schema.as_deref(), &format, output, sources),

        Commands::Get {
            files,
            path,
            resolve,
            format,
            default,
        } => cmd_get(&files, &resolve, &path, &format, default),

        Commands::Check { files } => cmd_check(&files),

        Commands::Schema { command } => match command {
            SchemaCommands::Validate { file } => cmd_schema_validate(&file),
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Also captures `log` records emitted by sitecfg-core
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Directory `${path:...}` references and file rules resolve against
fn project_root(files: &[PathBuf], root: Option<&Path>) -> Result<PathBuf, String> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => files
            .last()
            .and_then(|f| f.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::path::absolute(&root)
        .map_err(|e| format!("Failed to resolve project root {}: {}", root.display(), e))
}

fn load_fragments(files: &[PathBuf], set: &[String]) -> Result<Vec<ConfigFragment>, String> {
    if files.is_empty() {
        return Err("No configuration files specified".to_string());
    }

    let mut fragments = Vec::with_capacity(files.len() + 1);
    for file in files {
        let fragment = ConfigFragment::from_file(file)
            .map_err(|e| format!("Failed to load {}: {}", file.display(), e))?;
        fragments.push(fragment);
    }

    if !set.is_empty() {
        let overrides = ConfigFragment::from_assignments(CLI_SOURCE_ID, set)
            .map_err(|e| format!("Invalid --set value: {}", e))?;
        fragments.push(overrides);
    }

    Ok(fragments)
}

fn load_schema(path: &Path) -> Result<Schema, String> {
    Schema::from_file(path).map_err(|e| format!("Failed to load schema {}: {}", path.display(), e))
}

/// Why a command could not produce a resolved configuration
enum Failure {
    /// Bad input: unreadable files, duplicate ids, broken schema (exit 2)
    Input(String),
    /// The configuration resolved but is invalid (exit 1)
    Invalid(ValidationReport),
}

impl Failure {
    fn exit_code(&self) -> ExitCode {
        match self {
            Failure::Input(_) => ExitCode::from(2),
            Failure::Invalid(_) => ExitCode::from(1),
        }
    }
}

fn resolve_files(
    files: &[PathBuf],
    args: &ResolveArgs,
    schema: Option<&Path>,
) -> Result<ResolvedConfig, Failure> {
    let root = project_root(files, args.root.as_deref()).map_err(Failure::Input)?;
    let fragments = load_fragments(files, &args.set).map_err(Failure::Input)?;
    tracing::debug!(
        "Resolving {} fragments against {}",
        fragments.len(),
        root.display()
    );

    let mut resolver = Resolver::new(ResolveOptions::new(root));
    if let Some(path) = schema {
        let schema = load_schema(path).map_err(Failure::Input)?;
        resolver = resolver
            .with_schema(schema)
            .map_err(|e| Failure::Input(e.to_string()))?;
    }

    resolver.resolve(&fragments).map_err(|e| match e {
        ResolveError::Invalid(report) => Failure::Invalid(report),
        other => Failure::Input(other.to_string()),
    })
}

/// Print a failure to stderr in text form
fn report_failure(failure: &Failure) {
    match failure {
        Failure::Input(message) => eprintln!("{}", message.red()),
        Failure::Invalid(report) => {
            eprintln!("{} Configuration is invalid\n", "✗".red());
            print_entries(report.entries());
            eprintln!("\n{}", summary(report));
        }
    }
}

fn print_entries(entries: &[ValidationEntry]) {
    for entry in entries {
        let label = match entry.severity {
            Severity::Error => entry.severity.to_string().red().bold(),
            Severity::Warning => entry.severity.to_string().yellow().bold(),
        };
        let location = if entry.path.is_empty() {
            String::new()
        } else {
            format!(" {}", entry.path.bold())
        };
        eprintln!("{}[{}]{}: {}", label, entry.rule, location, entry.message);
    }
}

fn summary(report: &ValidationReport) -> String {
    format!(
        "{} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    )
}

fn write_output(content: &str, output: Option<PathBuf>) -> ExitCode {
    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }
    ExitCode::SUCCESS
}

fn validation_json(report: &ValidationReport) -> String {
    let json = serde_json::json!({
        "valid": !report.has_errors(),
        "errors": report.error_count(),
        "warnings": report.warning_count(),
        "entries": report,
    });
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
}

fn cmd_validate(
    files: &[PathBuf],
    args: &ResolveArgs,
    schema: Option<&Path>,
    format: &str,
    quiet: bool,
) -> ExitCode {
    let (report, code) = match resolve_files(files, args, schema) {
        Ok(config) => (config.warnings().clone(), ExitCode::SUCCESS),
        Err(Failure::Invalid(report)) => (report, ExitCode::from(1)),
        Err(failure) => {
            report_failure(&failure);
            return failure.exit_code();
        }
    };

    if format == "json" {
        println!("{}", validation_json(&report));
        return code;
    }

    if report.has_errors() {
        report_failure(&Failure::Invalid(report));
    } else {
        print_entries(report.entries());
        if !quiet {
            let files_str: Vec<_> = files.iter().map(|f| f.display().to_string()).collect();
            println!("{} {} is valid", "✓".green(), files_str.join(", "));
            if !report.is_empty() {
                println!("{}", summary(&report));
            }
        }
    }
    code
}

fn cmd_dump(
    files: &[PathBuf],
    args: &ResolveArgs,
    schema: Option<&Path>,
    format: &str,
    output: Option<PathBuf>,
    sources: bool,
) -> ExitCode {
    let config = match resolve_files(files, args, schema) {
        Ok(c) => c,
        Err(failure) => {
            report_failure(&failure);
            return failure.exit_code();
        }
    };
    print_entries(config.warnings().entries());

    let result = if sources {
        match format {
            "json" => serde_json::to_string_pretty(config.provenance())
                .map(|s| s + "\n")
                .map_err(|e| e.to_string()),
            _ => serde_yaml::to_string(config.provenance()).map_err(|e| e.to_string()),
        }
    } else {
        let rendered = match format {
            "json" => config.to_json().map(|s| s + "\n"),
            _ => config.to_yaml(),
        };
        rendered.map_err(|e| e.to_string())
    };

    match result {
        Ok(content) => write_output(&content, output),
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(2)
        }
    }
}

/// Render a value for `get`
fn render_value(value: &Value, format: &str) -> Result<String, String> {
    match format {
        "json" => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
        "yaml" => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => match value {
            Value::Sequence(_) | Value::Mapping(_) => {
                serde_yaml::to_string(value).map_err(|e| e.to_string())
            }
            scalar => Ok(format!("{}\n", scalar)),
        },
    }
}

fn cmd_get(
    files: &[PathBuf],
    args: &ResolveArgs,
    path: &str,
    format: &str,
    default: Option<String>,
) -> ExitCode {
    let config = match resolve_files(files, args, None) {
        Ok(c) => c,
        Err(failure) => {
            report_failure(&failure);
            return failure.exit_code();
        }
    };

    match config.get(path) {
        Ok(value) => match render_value(value, format) {
            Ok(rendered) => {
                print!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                ExitCode::from(2)
            }
        },
        Err(_) => {
            if let Some(default_val) = default {
                println!("{}", default_val);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}: Path '{}' not found", "Error".red(), path);
                ExitCode::from(1)
            }
        }
    }
}

/// Exit code for a file that failed to load: 2 when it could not be read, 1 when it is malformed
fn load_exit_code(error: &Error) -> u8 {
    match error.kind {
        ErrorKind::Io => 2,
        _ => 1,
    }
}

fn cmd_check(files: &[PathBuf]) -> ExitCode {
    let mut code = 0;

    for file in files {
        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ConfigFragment::from_file(file) {
            Ok(_) => {
                println!(
                    "{} {}: valid {}",
                    "✓".green(),
                    file.display(),
                    if ext == "json" { "JSON" } else { "YAML" }
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                code = code.max(load_exit_code(&e));
            }
        }
    }

    ExitCode::from(code)
}

fn cmd_schema_validate(file: &Path) -> ExitCode {
    match Schema::from_file(file) {
        Ok(_) => {
            println!("{} {}: valid JSON Schema", "✓".green(), file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}: {}", "✗".red(), file.display(), e);
            ExitCode::from(load_exit_code(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    const SITE: &str = r#"
title: Ionic Enterprise Tutorials
url: https://ionic.io
baseUrl: /docs/tutorials/
"#;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get_with_overrides() {
        let cli = Cli::try_parse_from([
            "sitecfg",
            "-vv",
            "get",
            "base.yaml",
            "site.yaml",
            "title",
            "--set",
            "title=Docs",
            "--root",
            "/srv/site",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Get {
                files,
                path,
                resolve,
                ..
            } => {
                assert_eq!(files, vec![PathBuf::from("base.yaml"), PathBuf::from("site.yaml")]);
                assert_eq!(path, "title");
                assert_eq!(resolve.set, vec!["title=Docs".to_string()]);
                assert_eq!(resolve.root, Some(PathBuf::from("/srv/site")));
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["sitecfg", "validate", "a.yaml", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_project_root_defaults_to_last_file_dir() {
        let files = vec![PathBuf::from("/srv/a/base.yaml"), PathBuf::from("/srv/b/site.yaml")];
        assert_eq!(project_root(&files, None).unwrap(), PathBuf::from("/srv/b"));
        assert_eq!(
            project_root(&files, Some(Path::new("/other"))).unwrap(),
            PathBuf::from("/other")
        );

        let bare = vec![PathBuf::from("site.yaml")];
        assert!(project_root(&bare, None).unwrap().is_absolute());
    }

    #[test]
    fn test_load_fragments_appends_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.yaml");
        std::fs::write(&file, SITE).unwrap();

        let fragments = load_fragments(&[file.clone()], &["trailingSlash=true".to_string()]).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].source_id(), file.display().to_string());
        assert_eq!(fragments[1].source_id(), CLI_SOURCE_ID);

        let err = load_fragments(&[dir.path().join("missing.yaml")], &[]).unwrap_err();
        assert!(err.starts_with("Failed to load"));
    }

    #[test]
    fn test_resolve_files_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.yaml");
        std::fs::write(&file, "url: ionic.io\n").unwrap();

        let args = ResolveArgs {
            root: None,
            set: Vec::new(),
        };
        match resolve_files(&[file.clone()], &args, None) {
            Err(Failure::Invalid(report)) => assert!(report.has_errors()),
            _ => panic!("expected an invalid configuration"),
        }

        match resolve_files(&[file.clone(), file], &args, None) {
            Err(Failure::Input(message)) => assert!(message.contains("duplicate")),
            _ => panic!("expected an input error"),
        }
    }

    #[test]
    fn test_resolve_files_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("site.yaml");
        std::fs::write(&file, SITE).unwrap();

        let args = ResolveArgs {
            root: None,
            set: vec!["themeConfig.prism.theme=dracula".to_string()],
        };
        let config = resolve_files(&[file], &args, None).ok().unwrap();
        assert_eq!(config.get_string("themeConfig.prism.theme").unwrap(), "dracula");
        assert_eq!(config.source_of("themeConfig.prism.theme"), Some(CLI_SOURCE_ID));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::from("github"), "text").unwrap(), "github\n");
        assert_eq!(render_value(&Value::from(24), "json").unwrap(), "24\n");
        assert_eq!(
            render_value(&Value::from(vec!["a", "b"]), "text").unwrap(),
            "- a\n- b\n"
        );
    }

    #[test]
    fn test_validation_json() {
        let mut report = ValidationReport::new();
        report.push(ValidationEntry::new(
            "favicon-exists",
            "favicon",
            Severity::Warning,
            "missing",
        ));
        let json: serde_json::Value = serde_json::from_str(&validation_json(&report)).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["warnings"], 1);
        assert_eq!(json["entries"][0]["rule"], "favicon-exists");
    }
}
