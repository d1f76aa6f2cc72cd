//! Subcommand implementations.

pub mod check;
pub mod fix;
pub mod init;
pub mod list_profiles;
pub mod list_rules;
pub mod output;

use anyhow::{Context, Result};
use playlint_core::{Analyzer, Config};
use playlint_rules::{rule_set, PROFILES};

use crate::config_resolver::ConfigSource;
use crate::LintArgs;

/// Loads the resolved configuration and applies command-line overrides.
pub fn load_config(source: &ConfigSource, args: &LintArgs) -> Result<Config> {
    let mut config = match source {
        ConfigSource::Default => Config::default(),
        other => {
            // Invariant: non-Default variants always have a path
            let p = other.path().context("resolved config has no path")?;
            if source.is_global() {
                tracing::info!("Using global config: {}", p.display());
            }
            Config::from_file(p)
                .with_context(|| format!("Failed to load config: {}", p.display()))?
        }
    };

    if let Some(profile) = &args.profile {
        config.profile = Some(profile.clone());
    }
    config.skip_list.extend(args.skip.iter().cloned());
    config.warn_list.extend(args.warn.iter().cloned());
    config.enable_list.extend(args.enable.iter().cloned());
    config.exclude_paths.extend(args.exclude.iter().cloned());
    Ok(config)
}

/// Builds an analyzer over the built-in catalog.
pub fn build_analyzer(args: &LintArgs, config: Config) -> Result<Analyzer> {
    let rules = rule_set(&config).context("Failed to register rules")?;
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    let mut builder = Analyzer::builder()
        .root(cwd.join(&args.project_dir))
        .rule_set(rules)
        .profiles(PROFILES.iter().copied())
        .config(config);
    for path in &args.paths {
        builder = builder.path(cwd.join(path));
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;
    tracing::info!(
        "Analyzing {} with {} rules",
        analyzer.root().display(),
        analyzer.rules().len()
    );
    Ok(analyzer)
}
