//! List rules command implementation.

use anyhow::{Context, Result};
use playlint_core::Config;
use playlint_rules::rule_set;

/// Runs the list-rules command.
pub fn run() -> Result<()> {
    let rules = rule_set(&Config::default()).context("Failed to register rules")?;

    println!("Available rules:\n");
    println!(
        "{:<20} {:<8} {:<12} {:<9} {:<8} Description",
        "Id", "Alias", "Profile", "Kind", "Fixable"
    );
    println!("{}", "-".repeat(90));

    for entry in rules.all() {
        let d = entry.descriptor();
        println!(
            "{:<20} {:<8} {:<12} {:<9} {:<8} {}",
            d.id,
            d.aliases.join(","),
            d.profile.as_deref().unwrap_or("-"),
            d.capability.to_string(),
            if d.fixable { "yes" } else { "no" },
            d.description
        );
    }

    println!("\nTags: {}", rules.tags().collect::<Vec<_>>().join(", "));
    println!("\nSuppress a finding inline with a trailing comment, e.g.:");
    println!("  - command: whoami  # noqa: name-missing no-changed-when");

    Ok(())
}
