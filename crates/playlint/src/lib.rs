//! # playlint
//!
//! Lint engine for automation playbooks, roles and task files.
//!
//! This is the facade crate: it re-exports the engine from `playlint-core`
//! and the built-in catalog from `playlint-rules`, and adds a small runner
//! for linting a project from a test suite.
//!
//! ## Quick Start: `cargo test` Integration
//!
//! ```rust,ignore
//! // tests/playbooks.rs
//! #[test]
//! fn playbooks_are_clean() {
//!     playlint::assert_clean(concat!(env!("CARGO_MANIFEST_DIR"), "/deploy"));
//! }
//! ```
//!
//! The project's `playlint.toml` (or `.playlint.toml`) is honoured.
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use playlint::rules::{rule_set, PROFILES};
//! use playlint::{Analyzer, Config};
//!
//! let config = Config::default();
//! let analyzer = Analyzer::builder()
//!     .root("./deploy")
//!     .rule_set(rule_set(&config)?)
//!     .profiles(PROFILES.iter().copied())
//!     .config(config)
//!     .build()?;
//!
//! let result = analyzer.analyze()?;
//! ```

#![forbid(unsafe_code)]

pub use playlint_core::*;

/// Built-in rules and the profile ladder.
pub mod rules {
    pub use playlint_rules::*;
}

mod runner;

pub use runner::{assert_clean, lint_project, RunnerError};
