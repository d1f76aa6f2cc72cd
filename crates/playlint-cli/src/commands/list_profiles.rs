//! List profiles command implementation.

use anyhow::{Context, Result};
use playlint_core::{Config, Profiles};
use playlint_rules::{rule_set, PROFILES};

/// Runs the list-profiles command.
pub fn run() -> Result<()> {
    let rules = rule_set(&Config::default()).context("Failed to register rules")?;
    let profiles = Profiles::new(PROFILES, &rules);

    let mut previous = std::collections::BTreeSet::new();
    for profile in profiles.ladder() {
        println!("{}: {}", profile.name, profile.description);
        let added: Vec<_> = profile.rules.difference(&previous).cloned().collect();
        if added.is_empty() {
            println!("  (no additional rules)");
        }
        for id in added {
            println!("  - {id}");
        }
        previous.clone_from(&profile.rules);
    }

    Ok(())
}
