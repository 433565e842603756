//! sitecfg-core: static-site configuration resolution and validation
//!
//! This crate merges partial site configuration fragments in precedence order,
//! resolves path and option references, validates the result against a rule
//! set and produces one immutable resolved configuration.
//!
//! # Example
//!
//! ```rust
//! use sitecfg_core::{ConfigFragment, ResolveOptions, Resolver};
//!
//! let base = ConfigFragment::from_yaml(
//!     "base",
//!     r#"
//! title: Ionic Enterprise Tutorials
//! url: https://ionic.io
//! baseUrl: /docs/tutorials/
//! onBrokenLinks: warn
//! "#,
//! )
//! .unwrap();
//! let site = ConfigFragment::from_yaml("site", "onBrokenLinks: throw").unwrap();
//!
//! let config = Resolver::new(ResolveOptions::new("."))
//!     .resolve(&[base, site])
//!     .unwrap();
//! assert_eq!(config.get_string("onBrokenLinks").unwrap(), "throw");
//! assert_eq!(config.source_of("onBrokenLinks"), Some("site"));
//! ```

pub mod error;
pub mod fragment;
pub mod reference;
pub mod report;
pub mod rules;
pub mod schema;
pub mod site;
pub mod value;

mod config;

pub use config::{resolve, Provenance, ResolveOptions, ResolvedConfig, Resolver};
pub use error::{Error, ErrorKind, ResolveError, Result};
pub use fragment::ConfigFragment;
pub use report::{Severity, ValidationEntry, ValidationReport};
pub use rules::{RuleContext, RuleKind, RuleSet, ValidationRule, Violation};
pub use schema::Schema;
pub use site::{BrokenLinkPolicy, ColorMode, Plugin, Preset, PrismTheme, RemarkPlugin};
pub use value::Value;
