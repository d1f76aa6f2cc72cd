//! Linting a whole project with its own configuration.

use playlint_core::{Analyzer, AnalyzerError, Config, ConfigError, LintResult, RegistryError};
use playlint_rules::{rule_set, PROFILES};
use std::path::{Path, PathBuf};

/// Config file names looked up in the project root, in priority order.
const CONFIG_CANDIDATES: &[&str] = &["playlint.toml", ".playlint.toml"];

/// Errors from [`lint_project`].
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The project config could not be read or parsed.
    #[error("{path}: {source}")]
    Config {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: ConfigError,
    },

    /// The catalog could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The run itself failed.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

/// Lints `root` with the built-in catalog and the project's own config.
///
/// # Errors
///
/// Returns an error if the config is invalid or the run fails.
pub fn lint_project(root: impl AsRef<Path>) -> Result<LintResult, RunnerError> {
    let root = root.as_ref();
    let config = project_config(root)?;
    let analyzer = Analyzer::builder()
        .root(root)
        .rule_set(rule_set(&config)?)
        .profiles(PROFILES.iter().copied())
        .config(config)
        .build()?;
    Ok(analyzer.analyze()?)
}

/// Lints `root` and panics with a report if any diagnostic reaches the
/// project's `fail_on` severity (error by default).
///
/// # Panics
///
/// Panics on violations, or if the run cannot be performed.
pub fn assert_clean(root: impl AsRef<Path>) {
    let root = root.as_ref();
    let fail_on = project_config(root)
        .unwrap_or_else(|e| panic!("playlint: {e}"))
        .fail_on_severity();
    let result = lint_project(root).unwrap_or_else(|e| panic!("playlint: {e}"));
    if result.has_violations_at(fail_on) {
        panic!("{}", result.format_test_report(fail_on));
    }
}

fn project_config(root: &Path) -> Result<Config, RunnerError> {
    let Some(path) = CONFIG_CANDIDATES
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file())
    else {
        return Ok(Config::default());
    };
    Config::from_file(&path).map_err(|source| RunnerError::Config { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_config_means_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = project_config(tmp.path()).unwrap();
        assert!(config.profile.is_none());
        assert!(config.skip_list.is_empty());
    }

    #[test]
    fn first_candidate_wins() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("playlint.toml"), "profile = \"basic\"\n").unwrap();
        fs::write(tmp.path().join(".playlint.toml"), "profile = \"min\"\n").unwrap();
        let config = project_config(tmp.path()).unwrap();
        assert_eq!(config.profile.as_deref(), Some("basic"));
    }

    #[test]
    fn invalid_config_names_the_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".playlint.toml"), "skip_list = 3\n").unwrap();
        let err = project_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(".playlint.toml"));
    }
}
