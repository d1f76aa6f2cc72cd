//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# playlint configuration

# Profile to run: min, basic, moderate, safety, shared, production.
# Without a profile every rule runs.
profile = "basic"

# Rules, tags or rule[sub] entries to skip entirely
skip_list = []

# Rules, tags or rule[sub] entries reported as warnings only
warn_list = ["experimental"]

# Opt-in rules to enable
enable_list = []

# Glob patterns to exclude from analysis
exclude_paths = [
    ".cache/**",
    "collections/**",
]

# Rules allowed to write fixes ("all" for every fixable rule)
fix = ["all"]

# Extra directories searched for roles
# roles_path = ["../shared-roles"]

# Fix passes per file before giving up on convergence
max_fix_passes = 5

# Lowest severity that fails the run: error, warning or info
# fail_on = "error"

[analyzer]
# Respect .gitignore files
respect_gitignore = true
# Lint documents in parallel
parallel = true
# ignore_file = ".playlint-ignore"

# Rule configurations
# Each rule can be enabled/disabled and have its severity overridden

[rules.yaml]
# severity = "warning"  # Override default severity
max_line_length = 160

# [rules.fqcn]
# enabled = false
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("playlint.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created playlint.toml");
    println!("\nNext steps:");
    println!("  1. Edit playlint.toml to configure rules");
    println!("  2. Run: playlint check");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playlint_core::Config;

    #[test]
    fn starter_config_parses() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.profile.as_deref(), Some("basic"));
        assert_eq!(config.max_fix_passes, 5);
        assert_eq!(config.rule_config("yaml").map(|r| r.get_int("max_line_length", 0)), Some(160));
    }
}
