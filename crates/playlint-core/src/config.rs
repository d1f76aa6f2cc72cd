//! Configuration types for playlint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level configuration for playlint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile (e.g., "basic", "production"). No profile means every
    /// rule is active.
    #[serde(default)]
    pub profile: Option<String>,

    /// Rule ids, aliases or tags whose findings are dropped for the run.
    #[serde(default)]
    pub skip_list: Vec<String>,

    /// Rule ids, aliases or tags whose findings are demoted to warnings.
    #[serde(default)]
    pub warn_list: Vec<String>,

    /// Opt-in rules to enable.
    #[serde(default)]
    pub enable_list: Vec<String>,

    /// Glob patterns of documents to leave out of the run.
    #[serde(default)]
    pub exclude_paths: Vec<String>,

    /// Rules allowed to write fixes (`"all"` for every fixable rule).
    #[serde(default = "default_write_list")]
    pub fix: Vec<String>,

    /// Extra directories searched for roles.
    #[serde(default)]
    pub roles_path: Vec<PathBuf>,

    /// Upper bound on autofix passes per document.
    #[serde(default = "default_max_fix_passes")]
    pub max_fix_passes: usize,

    /// Lowest severity that fails the run (default: error).
    #[serde(default)]
    pub fail_on: Option<crate::Severity>,

    /// Analyzer configuration.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Per-rule configurations.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: None,
            skip_list: Vec::new(),
            warn_list: Vec::new(),
            enable_list: Vec::new(),
            exclude_paths: Vec::new(),
            fix: default_write_list(),
            roles_path: Vec::new(),
            max_fix_passes: default_max_fix_passes(),
            fail_on: None,
            analyzer: AnalyzerConfig::default(),
            rules: HashMap::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        if config.max_fix_passes == 0 {
            return Err(ConfigError::Invalid {
                message: "max_fix_passes must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.rules
            .get(rule_id)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_id: &str) -> Option<crate::Severity> {
        self.rules.get(rule_id).and_then(|c| c.severity)
    }

    /// Gets the configuration block of a rule.
    #[must_use]
    pub fn rule_config(&self, rule_id: &str) -> Option<&RuleConfig> {
        self.rules.get(rule_id)
    }

    /// Lowest severity that fails the run, defaulting to error.
    #[must_use]
    pub fn fail_on_severity(&self) -> crate::Severity {
        self.fail_on.unwrap_or(crate::Severity::Error)
    }
}

/// Analyzer-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Root directory to analyze (default: current directory).
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Whether to respect .gitignore files during discovery.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Whether documents are processed in parallel.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Ignore file path, relative to the root (default: `.playlint-ignore`).
    #[serde(default)]
    pub ignore_file: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            respect_gitignore: true,
            parallel: true,
            ignore_file: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_write_list() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_max_fix_passes() -> usize {
    5
}

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<crate::Severity>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    /// Reads an integer option, falling back to `default` when the key is
    /// missing or not an integer.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.options
            .get(key)
            .and_then(toml::Value::as_integer)
            .unwrap_or(default)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// Well-formed but unusable configuration.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fixes_everything() {
        let config = Config::default();
        assert!(config.analyzer.respect_gitignore);
        assert!(config.analyzer.parallel);
        assert_eq!(config.fix, vec!["all".to_string()]);
        assert_eq!(config.max_fix_passes, 5);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parses_lists_and_rule_blocks() {
        let toml = r#"
profile = "moderate"
skip_list = ["fqcn"]
warn_list = ["yaml[line-length]", "experimental"]
exclude_paths = ["vendor/**"]
max_fix_passes = 3

[analyzer]
root = "./playbooks"
parallel = false

[rules.yaml]
severity = "warning"
max_line_length = 120

[rules.name-casing]
enabled = false
"#;

        let config = Config::parse(toml).expect("Failed to parse");
        assert_eq!(config.profile.as_deref(), Some("moderate"));
        assert_eq!(config.skip_list, vec!["fqcn".to_string()]);
        assert_eq!(config.analyzer.root, PathBuf::from("./playbooks"));
        assert!(!config.analyzer.parallel);
        assert_eq!(config.max_fix_passes, 3);
        assert!(!config.is_rule_enabled("name-casing"));
        assert!(config.is_rule_enabled("yaml"));
        assert_eq!(config.rule_severity("yaml"), Some(crate::Severity::Warning));

        let rule_config = config.rule_config("yaml").unwrap();
        assert_eq!(rule_config.get_int("max_line_length", 160), 120);
    }

    #[test]
    fn fail_on_takes_a_severity_name() {
        let config = Config::parse("fail_on = \"warning\"").unwrap();
        assert_eq!(config.fail_on_severity(), crate::Severity::Warning);
        assert_eq!(Config::default().fail_on_severity(), crate::Severity::Error);

        let err = Config::parse("fail_on = \"warnnig\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_zero_fix_passes() {
        let err = Config::parse("max_fix_passes = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
