//! Profiles: a cumulative ladder of rule sets.
//!
//! Each profile contains every rule of the profiles below it plus the rules
//! that name it as their own.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::registry::RuleSet;

/// One rung of the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Canonical ids of every rule in the profile, inherited ones included.
    pub rules: BTreeSet<String>,
}

impl Profile {
    /// Returns true if the profile contains `rule_id`.
    #[must_use]
    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.contains(rule_id)
    }
}

/// Ordered profiles, lowest first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Profiles {
    ladder: Vec<Profile>,
}

impl Profiles {
    /// Builds the ladder from `(name, description)` pairs and the rules'
    /// own profile declarations. Rules naming a profile outside the ladder
    /// belong to none.
    #[must_use]
    pub fn new(ladder: &[(&str, &str)], rules: &RuleSet) -> Self {
        let mut profiles = Vec::with_capacity(ladder.len());
        let mut inherited = BTreeSet::new();
        for (name, description) in ladder {
            for entry in rules.all() {
                if entry.descriptor().profile.as_deref() == Some(*name) {
                    inherited.insert(entry.id().to_string());
                }
            }
            profiles.push(Profile {
                name: (*name).to_string(),
                description: (*description).to_string(),
                rules: inherited.clone(),
            });
        }
        for entry in rules.all() {
            if let Some(profile) = &entry.descriptor().profile {
                if !ladder.iter().any(|(name, _)| name == profile) {
                    tracing::warn!(rule = %entry.id(), profile = %profile, "rule names an unknown profile");
                }
            }
        }
        Self { ladder: profiles }
    }

    /// Looks up a profile.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.ladder.iter().find(|p| p.name == name)
    }

    /// Lowest profile containing `rule_id`.
    #[must_use]
    pub fn lowest_containing(&self, rule_id: &str) -> Option<&str> {
        self.ladder
            .iter()
            .find(|p| p.contains(rule_id))
            .map(|p| p.name.as_str())
    }

    /// Profiles, lowest first.
    #[must_use]
    pub fn ladder(&self) -> &[Profile] {
        &self.ladder
    }

    /// Profile names, lowest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ladder.iter().map(|p| p.name.as_str())
    }
}
