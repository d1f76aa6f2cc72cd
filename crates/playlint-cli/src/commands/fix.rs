//! Fix command implementation.

use anyhow::{Context, Result};
use playlint_core::{FixReport, RunOutcome};

use crate::config_resolver::ConfigSource;
use crate::{LintArgs, OutputFormat};

/// Runs the fix command.
pub fn run(
    args: &LintArgs,
    dry_run: bool,
    format: OutputFormat,
    source: &ConfigSource,
) -> Result<RunOutcome> {
    let config = super::load_config(source, args)?;
    let fail_on = config.fail_on_severity();
    let analyzer = super::build_analyzer(args, config)?;

    let (report, result) = analyzer.fix(dry_run).context("Fix failed")?;

    print_summary(&report);
    super::output::print(&result, format, analyzer.root())?;

    Ok(result.outcome_at(fail_on))
}

fn print_summary(report: &FixReport) {
    let verb = if report.dry_run { "Would fix" } else { "Fixed" };
    for file in report.changed_files() {
        eprintln!(
            "{verb} {} ({} fix(es), {} pass(es))",
            file.relative.display(),
            file.applied.len(),
            file.passes
        );
        for fix in &file.applied {
            let tag = match &fix.sub_tag {
                Some(sub) => format!("{}[{sub}]", fix.rule_id),
                None => fix.rule_id.clone(),
            };
            eprintln!("  line {}: {tag} {}", fix.line, fix.message);
        }
    }
    eprintln!(
        "{verb} {} issue(s) in {} file(s); {} fix(es) failed",
        report.fixes_applied(),
        report.changed_files().count(),
        report.failures().count()
    );
}
