//! End-to-end resolution of a full documentation site configuration

use std::path::Path;

use pretty_assertions::assert_eq;
use sitecfg_core::{resolve, ConfigFragment, ResolveError, ResolveOptions, ValidationReport};

const SITE: &str = r#"
title: Ionic Enterprise Tutorials
url: https://ionic.io
trailingSlash: false
baseUrl: /docs/tutorials/
baseUrlIssueBanner: false
onBrokenLinks: throw
onBrokenMarkdownLinks: warn
favicon: img/favicon-96x96.png
organizationName: ionic-enterprise
projectName: tutorials
titleDelimiter: "-"
themeConfig:
  logo:
    alt: Ionic Enterprise Tutorials
    src: img/logo.svg
    srcDark: img/favicon-96x96.png
    href: /docs/tutorials
    height: 24
    width: 80
  sidebar:
    productDropdown:
      title: Enterprise Tutorials
      logo:
        width: 20
        height: 20
        alt: ${ref:sidebarLabel}
        src: ${themeConfig.logo.srcDark}
    backButton:
      url:
        href: /docs
  colorMode:
    respectPrefersColorScheme: true
  prism:
    theme: github
    darkTheme: dracula
    additionalLanguages: [shell-session, kotlin, groovy, java, swift, ruby, json, bash]
  zoom:
    selector: ".markdown em > img"
    background:
      light: "var(--token-background-color)"
      dark: "var(--token-background-color)"
    config:
      margin: 75
      scrollOffset: 20
sidebarLabel: Enterprise Tutorials
plugins:
  - docusaurus-plugin-image-zoom
presets:
  - - "@ionic-docs/preset-classic"
    - docs:
        beforeDefaultRemarkPlugins:
          - ["@code-hike/mdx", {lineNumbers: true}]
        routeBasePath: /docs/tutorials
        sidebarPath: ${path:./sidebars.js}
        breadcrumbs: false
      pages: false
      theme:
        customCss:
          - ${path:@code-hike/mdx/styles.css}
          - ${path:./src/styles/custom.css}
"#;

fn write(root: &Path, relative: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, "").unwrap();
}

fn site_root() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in [
        "sidebars.js",
        "src/styles/custom.css",
        "node_modules/@code-hike/mdx/styles.css",
        "static/img/logo.svg",
        "static/img/favicon-96x96.png",
    ] {
        write(dir.path(), file);
    }
    dir
}

fn report_of(err: ResolveError) -> ValidationReport {
    match err {
        ResolveError::Invalid(report) => report,
        other => panic!("expected a validation failure, got {}", other),
    }
}

#[test]
fn resolves_the_full_site() {
    let root = site_root();
    let config = resolve(
        &[ConfigFragment::from_yaml("docusaurus.yaml", SITE).unwrap()],
        ResolveOptions::new(root.path()),
    )
    .unwrap();

    assert!(config.warnings().is_empty());
    assert_eq!(
        config
            .get_string("presets[0][1].docs.sidebarPath")
            .unwrap(),
        root.path().join("sidebars.js").display().to_string()
    );
    assert_eq!(
        config
            .get_string("presets[0][1].theme.customCss[0]")
            .unwrap(),
        root.path()
            .join("node_modules/@code-hike/mdx/styles.css")
            .display()
            .to_string()
    );
    assert_eq!(
        config
            .get_string("themeConfig.sidebar.productDropdown.logo.src")
            .unwrap(),
        "img/favicon-96x96.png"
    );
    assert_eq!(
        config
            .get_string("themeConfig.sidebar.productDropdown.logo.alt")
            .unwrap(),
        "Enterprise Tutorials"
    );
    assert_eq!(config.get_i64("themeConfig.zoom.config.margin").unwrap(), 75);
    assert_eq!(config.source_of("themeConfig.prism.theme"), Some("docusaurus.yaml"));
}

#[test]
fn overrides_take_precedence_with_provenance() {
    let root = site_root();
    let fragments = [
        ConfigFragment::from_yaml("docusaurus.yaml", SITE).unwrap(),
        ConfigFragment::from_assignments(
            "cli",
            &[
                "themeConfig.prism.theme=vsLight",
                "themeConfig.prism.additionalLanguages=[bash]",
                "themeConfig.zoom.config=null",
            ],
        )
        .unwrap(),
    ];
    let config = resolve(&fragments, ResolveOptions::new(root.path())).unwrap();

    assert_eq!(config.get_string("themeConfig.prism.theme").unwrap(), "vsLight");
    assert_eq!(config.source_of("themeConfig.prism.theme"), Some("cli"));
    assert_eq!(config.source_of("themeConfig.prism.darkTheme"), Some("docusaurus.yaml"));
    assert_eq!(
        config
            .get("themeConfig.prism.additionalLanguages")
            .unwrap()
            .as_sequence()
            .map(<[_]>::len),
        Some(1)
    );
    assert!(config.get("themeConfig.zoom.config").is_err());
    assert!(!config
        .provenance()
        .keys()
        .any(|path| path.starts_with("themeConfig.zoom.config")));
}

#[test]
fn reports_every_problem_at_once() {
    let root = tempfile::tempdir().unwrap();
    let fragments = [
        ConfigFragment::from_yaml("docusaurus.yaml", SITE).unwrap(),
        ConfigFragment::from_yaml(
            "broken.yaml",
            r#"
onBrokenLinks: explode
plugins: [docusaurus-plugin-image-zoom, docusaurus-plugin-unknown]
themeConfig:
  colorMode:
    defaultMode: sepia
"#,
        )
        .unwrap(),
    ];

    let report = report_of(
        resolve(&fragments, ResolveOptions::new(root.path())).unwrap_err(),
    );
    let errors: Vec<(&str, &str)> = report
        .errors()
        .map(|e| (e.rule.as_str(), e.path.as_str()))
        .collect();
    assert_eq!(
        errors,
        vec![
            ("unresolvable-reference", "presets[0][1].docs.sidebarPath"),
            ("unresolvable-reference", "presets[0][1].theme.customCss[0]"),
            ("unresolvable-reference", "presets[0][1].theme.customCss[1]"),
            ("on-broken-links", "onBrokenLinks"),
            ("known-plugins", "plugins[1]"),
            ("color-mode", "themeConfig.colorMode.defaultMode"),
        ]
    );

    let warnings: Vec<&str> = report.warnings().map(|e| e.rule.as_str()).collect();
    assert_eq!(warnings, vec!["favicon-exists", "logo-exists", "logo-dark-exists"]);
    assert_eq!(report.error_count(), 6);
}
