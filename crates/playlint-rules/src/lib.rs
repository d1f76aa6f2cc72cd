//! # playlint-rules
//!
//! Built-in lint rules for playlint.
//!
//! ## Available Rules
//!
//! | Id | Alias | Profile | Fixable | Description |
//! |----|-------|---------|---------|-------------|
//! | `name-missing` | 502 | basic | no | Tasks and handlers must be named |
//! | `yaml` | 201 | basic | yes | Trailing spaces, truthy values, line length |
//! | `eof-newline` | | basic | yes | Exactly one newline at the end of a document |
//! | `jinja` | | basic | yes | Spacing inside template expressions |
//! | `name-casing` | | moderate | yes | Names start with an uppercase letter |
//! | `no-changed-when` | 301 | shared | no | Command tasks declare when they change |
//! | `fqcn` | | production | yes | Builtin actions use `ansible.builtin.` |
//!
//! ## Usage
//!
//! ```ignore
//! use playlint_core::{Analyzer, Config};
//! use playlint_rules::{rule_set, PROFILES};
//!
//! let config = Config::default();
//! let analyzer = Analyzer::builder()
//!     .root("./playbooks")
//!     .rule_set(rule_set(&config)?)
//!     .profiles(PROFILES.iter().copied())
//!     .config(config)
//!     .build()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod eof_newline;
mod fqcn;
mod jinja;
mod name_casing;
mod name_missing;
mod no_changed_when;
mod profiles;
mod yaml;

#[cfg(test)]
mod testing;

pub use eof_newline::EofNewline;
pub use fqcn::Fqcn;
pub use jinja::Jinja;
pub use name_casing::NameCasing;
pub use name_missing::NameMissing;
pub use no_changed_when::NoChangedWhen;
pub use profiles::{all_rules, rule_set, PROFILES};
pub use yaml::{Yaml, DEFAULT_MAX_LINE_LENGTH};

/// Re-export core types for convenience.
pub use playlint_core::{Matcher, Rule, RuleSet, Severity};
