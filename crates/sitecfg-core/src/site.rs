//! Site vocabulary and the default site rules
//!
//! Plugin, preset, theme and policy identifiers are closed sets. Each set is
//! an enum with string conversions, and [`RuleSet::site_defaults`] checks the
//! configuration against them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::rules::{RuleContext, RuleKind, RuleSet, ValidationRule, Violation};
use crate::value::{child_path, index_path, Value};

/// A name outside one of the closed site vocabularies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    /// Which vocabulary was searched (e.g., "plugin")
    pub kind: &'static str,
    /// The rejected name
    pub name: String,
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Every member, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The configuration spelling of this member
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Configuration spellings of every member
            pub fn names() -> impl Iterator<Item = &'static str> {
                Self::ALL.iter().map(|member| member.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownName;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownName {
                        kind: $kind,
                        name: s.to_string(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                name.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

closed_enum! {
    /// What the site build does with a broken link
    BrokenLinkPolicy, "broken link policy" {
        Ignore => "ignore",
        Log => "log",
        Warn => "warn",
        Throw => "throw",
    }
}

closed_enum! {
    /// Default color mode
    ColorMode, "color mode" {
        Light => "light",
        Dark => "dark",
    }
}

closed_enum! {
    /// Site plugins the build knows how to load
    Plugin, "plugin" {
        ImageZoom => "docusaurus-plugin-image-zoom",
        IdealImage => "@docusaurus/plugin-ideal-image",
        ClientRedirects => "@docusaurus/plugin-client-redirects",
        Sitemap => "@docusaurus/plugin-sitemap",
        GoogleGtag => "@docusaurus/plugin-google-gtag",
        ContentDocs => "@docusaurus/plugin-content-docs",
    }
}

closed_enum! {
    /// Presets bundling docs, pages and theme
    Preset, "preset" {
        Classic => "classic",
        DocusaurusClassic => "@docusaurus/preset-classic",
        IonicClassic => "@ionic-docs/preset-classic",
    }
}

closed_enum! {
    /// Remark plugins accepted in docs and blog options
    RemarkPlugin, "remark plugin" {
        CodeHike => "@code-hike/mdx",
        Math => "remark-math",
        Gfm => "remark-gfm",
        Npm2Yarn => "@docusaurus/remark-plugin-npm2yarn",
    }
}

closed_enum! {
    /// Syntax highlighting themes
    PrismTheme, "prism theme" {
        Dracula => "dracula",
        DuotoneDark => "duotoneDark",
        DuotoneLight => "duotoneLight",
        Github => "github",
        GruvboxMaterialDark => "gruvboxMaterialDark",
        GruvboxMaterialLight => "gruvboxMaterialLight",
        JettwaveDark => "jettwaveDark",
        JettwaveLight => "jettwaveLight",
        NightOwl => "nightOwl",
        NightOwlLight => "nightOwlLight",
        OceanicNext => "oceanicNext",
        Okaidia => "okaidia",
        OneDark => "oneDark",
        OneLight => "oneLight",
        Palenight => "palenight",
        ShadesOfPurple => "shadesOfPurple",
        Synthwave84 => "synthwave84",
        Ultramin => "ultramin",
        VsDark => "vsDark",
        VsLight => "vsLight",
    }
}

/// Option sections of a preset that accept remark plugins
const REMARK_SECTIONS: &[&str] = &["docs", "blog"];

/// Option keys holding remark plugin lists
const REMARK_KEYS: &[&str] = &["beforeDefaultRemarkPlugins", "remarkPlugins"];

/// Name of a plugin-style entry: `name` or `[name, options]`
fn entry_name(entry: &Value) -> Option<&str> {
    match entry {
        Value::String(name) => Some(name),
        Value::Sequence(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Options of a `[name, options]` entry
fn entry_options(entry: &Value) -> Option<&Value> {
    entry.as_sequence().and_then(|items| items.get(1))
}

/// Sequence items below `path`, with their option paths
fn items_at<'a>(ctx: &RuleContext<'a>, path: &str) -> Vec<(String, &'a Value)> {
    ctx.get(path)
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .map(|(i, item)| (index_path(path, i), item))
                .collect()
        })
        .unwrap_or_default()
}

/// Check that every entry of the list at `path` names a member of `T`
fn known_entries<T: FromStr<Err = UnknownName>>(
    items: Vec<(String, &Value)>,
) -> Vec<Violation> {
    items
        .into_iter()
        .filter_map(|(path, entry)| match entry_name(entry) {
            Some(name) => name
                .parse::<T>()
                .err()
                .map(|e| Violation::at(path).with_detail(e.to_string())),
            None => Some(Violation::at(path).with_detail(format!(
                "expected a name or [name, options], got {}",
                entry.type_name()
            ))),
        })
        .collect()
}

/// Options mapping of every preset entry, with its option path
fn preset_options<'a>(ctx: &RuleContext<'a>) -> Vec<(String, &'a Value)> {
    items_at(ctx, "presets")
        .into_iter()
        .filter_map(|(path, entry)| {
            entry_options(entry)
                .filter(|options| options.is_mapping())
                .map(|options| (index_path(&path, 1), options))
        })
        .collect()
}

/// Files named by `key` in each preset's options must exist under the root
fn preset_files_exist(ctx: &RuleContext<'_>, key: &str) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (options_path, options) in preset_options(ctx) {
        let Some(value) = options.lookup(key) else {
            continue;
        };
        let path = child_path(&options_path, key);
        let files: Vec<(String, &Value)> = match value {
            // `false` disables the section file
            Value::Bool(false) => continue,
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (index_path(&path, i), item))
                .collect(),
            other => vec![(path, other)],
        };

        for (file_path, file) in files {
            match file.as_str() {
                Some(name) if ctx.root.join(name).exists() => {}
                Some(name) => violations.push(
                    Violation::at(file_path)
                        .with_detail(format!("'{}' not found", ctx.root.join(name).display())),
                ),
                None => violations.push(Violation::at(file_path).with_detail(format!(
                    "expected a file path, got {}",
                    file.type_name()
                ))),
            }
        }
    }

    violations
}

impl RuleSet {
    /// Create a rule set with the default site rules
    pub fn site_defaults() -> Self {
        let mut rules = Self::new();
        rules.register_site_rules();
        rules
    }

    /// Register the default site rules, in run order
    fn register_site_rules(&mut self) {
        let site_rules = [
            ValidationRule::required("title-required", "title"),
            ValidationRule::required("url-required", "url"),
            ValidationRule::required("base-url-required", "baseUrl"),
            ValidationRule::absolute_url("url-absolute", "url"),
            ValidationRule::format(
                "url-without-path",
                "url",
                "should not carry a path; put it in baseUrl",
                |value| match value.as_str().and_then(|s| url::Url::parse(s).ok()) {
                    Some(parsed) if !matches!(parsed.path(), "" | "/") => {
                        Err(format!("path '{}'", parsed.path()))
                    }
                    _ => Ok(()),
                },
            )
            .warning(),
            ValidationRule::format(
                "base-url-slashes",
                "baseUrl",
                "must begin and end with '/'",
                |value| match value.as_str() {
                    Some(s) if s.starts_with('/') && s.ends_with('/') => Ok(()),
                    Some(s) => Err(format!("got '{}'", s)),
                    None => Err(format!("expected a string, got {}", value.type_name())),
                },
            ),
            ValidationRule::one_of("on-broken-links", "onBrokenLinks", BrokenLinkPolicy::names()),
            ValidationRule::one_of(
                "on-broken-markdown-links",
                "onBrokenMarkdownLinks",
                BrokenLinkPolicy::names(),
            ),
            ValidationRule::one_of(
                "on-broken-anchors",
                "onBrokenAnchors",
                BrokenLinkPolicy::names(),
            ),
            ValidationRule::of_type("trailing-slash-type", "trailingSlash", "boolean"),
            ValidationRule::file_exists("favicon-exists", "favicon", Some("static")).warning(),
            ValidationRule::file_exists("logo-exists", "themeConfig.logo.src", Some("static"))
                .warning(),
            ValidationRule::file_exists(
                "logo-dark-exists",
                "themeConfig.logo.srcDark",
                Some("static"),
            )
            .warning(),
            ValidationRule::new(
                "known-plugins",
                "plugins",
                RuleKind::Format,
                "unknown plugin",
                |ctx| known_entries::<Plugin>(items_at(ctx, "plugins")),
            ),
            ValidationRule::new(
                "known-presets",
                "presets",
                RuleKind::Format,
                "unknown preset",
                |ctx| known_entries::<Preset>(items_at(ctx, "presets")),
            ),
            ValidationRule::new(
                "known-remark-plugins",
                "presets",
                RuleKind::Format,
                "unknown remark plugin",
                |ctx| {
                    let mut items = Vec::new();
                    for (options_path, options) in preset_options(ctx) {
                        for section in REMARK_SECTIONS {
                            for key in REMARK_KEYS {
                                let list_path =
                                    child_path(&child_path(&options_path, section), key);
                                let relative = child_path(section, key);
                                if let Some(list) =
                                    options.lookup(&relative).and_then(Value::as_sequence)
                                {
                                    items.extend(
                                        list.iter()
                                            .enumerate()
                                            .map(|(i, item)| (index_path(&list_path, i), item)),
                                    );
                                }
                            }
                        }
                    }
                    known_entries::<RemarkPlugin>(items)
                },
            ),
            ValidationRule::one_of("prism-theme", "themeConfig.prism.theme", PrismTheme::names()),
            ValidationRule::one_of(
                "prism-dark-theme",
                "themeConfig.prism.darkTheme",
                PrismTheme::names(),
            ),
            ValidationRule::one_of(
                "color-mode",
                "themeConfig.colorMode.defaultMode",
                ColorMode::names(),
            ),
            ValidationRule::new(
                "preset-sidebar-exists",
                "presets",
                RuleKind::Format,
                "sidebar file must exist",
                |ctx| preset_files_exist(ctx, "docs.sidebarPath"),
            ),
            ValidationRule::new(
                "preset-css-exists",
                "presets",
                RuleKind::Format,
                "stylesheet must exist",
                |ctx| preset_files_exist(ctx, "theme.customCss"),
            ),
            ValidationRule::cross_field(
                "deploy-names-paired",
                "organizationName",
                "organizationName and projectName must be set together",
                |ctx| match (ctx.get("organizationName"), ctx.get("projectName")) {
                    (Some(_), None) => vec![Violation::at("projectName")],
                    (None, Some(_)) => vec![Violation::at("organizationName")],
                    _ => Vec::new(),
                },
            ),
            ValidationRule::cross_field(
                "logo-href-under-base-url",
                "themeConfig.logo.href",
                "logo link should stay under baseUrl",
                |ctx| {
                    let (Some(href), Some(base)) =
                        (ctx.get_str("themeConfig.logo.href"), ctx.get_str("baseUrl"))
                    else {
                        return Vec::new();
                    };
                    // External links are not site paths
                    if !href.starts_with('/') {
                        return Vec::new();
                    }
                    let base_dir = base.trim_end_matches('/');
                    if href == base_dir || href.starts_with(base) || base_dir.is_empty() {
                        Vec::new()
                    } else {
                        vec![Violation::at("themeConfig.logo.href")
                            .with_detail(format!("'{}' is outside '{}'", href, base))]
                    }
                },
            )
            .warning(),
        ];

        for rule in site_rules {
            let registered = self.register(rule);
            debug_assert!(registered.is_ok(), "duplicate site rule: {:?}", registered);
        }
    }
}
