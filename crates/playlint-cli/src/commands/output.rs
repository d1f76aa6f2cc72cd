//! Shared output formatting for lint results.

use anyhow::Result;
use playlint_core::{DiagnosticReport, LintResult, Severity};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::OutputFormat;

/// Print lint results in the specified format.
pub fn print(result: &LintResult, format: OutputFormat, root: &Path) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result),
        OutputFormat::Json => return print_json(result),
        OutputFormat::Compact => print_compact(result),
        OutputFormat::Pretty => print_pretty(result, root),
    }
    Ok(())
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => BLUE,
    }
}

/// Diagnostics grouped under one header per file.
fn print_text(result: &LintResult) {
    let mut current: Option<&Path> = None;
    for diagnostic in &result.diagnostics {
        let file = diagnostic.location.file.as_path();
        if current != Some(file) {
            if current.is_some() {
                println!();
            }
            println!("{BOLD}{}{RESET}", file.display());
            current = Some(file);
        }
        println!(
            "  {:>4}:{:<3} {}{}{RESET} [{}] {}",
            diagnostic.location.line,
            diagnostic.location.column,
            color(diagnostic.severity),
            diagnostic.severity,
            diagnostic.tag(),
            diagnostic.message,
        );
    }
    if current.is_some() {
        println!();
    }

    let (errors, warnings, infos) = result.count_by_severity();
    let summary = if errors > 0 {
        RED
    } else if warnings > 0 {
        YELLOW
    } else {
        GREEN
    };
    println!(
        "{summary}Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s){RESET}",
        result.files_checked
    );
    if result.cancelled {
        println!("Run was cancelled; results are partial.");
    }
}

fn print_json(result: &LintResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

fn print_compact(result: &LintResult) {
    for diagnostic in &result.diagnostics {
        println!("{diagnostic}");
    }
}

fn print_pretty(result: &LintResult, root: &Path) {
    let mut sources: HashMap<&PathBuf, String> = HashMap::new();
    for diagnostic in &result.diagnostics {
        let file = &diagnostic.location.file;
        let text = sources.entry(file).or_insert_with(|| {
            std::fs::read_to_string(root.join(file)).unwrap_or_default()
        });
        let report = miette::Report::new(DiagnosticReport::new(diagnostic, text));
        println!("{report:?}");
    }
    let (errors, warnings, infos) = result.count_by_severity();
    println!(
        "Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)",
        result.files_checked
    );
}
