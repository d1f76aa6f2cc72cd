//! Check command implementation.

use anyhow::{Context, Result};
use playlint_core::RunOutcome;

use crate::config_resolver::ConfigSource;
use crate::{LintArgs, OutputFormat};

/// Runs the check command.
pub fn run(args: &LintArgs, format: OutputFormat, source: &ConfigSource) -> Result<RunOutcome> {
    let config = super::load_config(source, args)?;
    let fail_on = config.fail_on_severity();
    let analyzer = super::build_analyzer(args, config)?;

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, format, analyzer.root())?;

    Ok(result.outcome_at(fail_on))
}
