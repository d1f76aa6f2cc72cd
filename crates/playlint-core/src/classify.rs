//! Severity and profile classification of surviving candidates.

use crate::config::Config;
use crate::profile::{Profile, Profiles};
use crate::registry::RuleSet;
use crate::types::{Diagnostic, MatchCandidate, Severity};

/// Turns candidates into diagnostics.
#[derive(Debug)]
pub struct Classifier<'a> {
    rules: &'a RuleSet,
    profiles: &'a Profiles,
    active: Option<&'a Profile>,
    config: &'a Config,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier. `active` is the profile selected for the run.
    #[must_use]
    pub fn new(
        rules: &'a RuleSet,
        profiles: &'a Profiles,
        active: Option<&'a Profile>,
        config: &'a Config,
    ) -> Self {
        Self {
            rules,
            profiles,
            active,
            config,
        }
    }

    /// Returns true if the active profile keeps findings of `rule_id`.
    #[must_use]
    pub fn in_profile(&self, rule_id: &str) -> bool {
        let core = self
            .rules
            .lookup_by_id(rule_id)
            .is_some_and(|e| e.descriptor().is_core());
        core || self.active.map_or(true, |p| p.contains(rule_id))
    }

    /// Classifies one candidate. `demoted` caps the severity at warning.
    /// Returns `None` when the active profile excludes the rule.
    #[must_use]
    pub fn classify(&self, candidate: MatchCandidate, demoted: bool) -> Option<Diagnostic> {
        if !self.in_profile(&candidate.rule_id) {
            return None;
        }
        let mut severity = self
            .config
            .rule_severity(&candidate.rule_id)
            .unwrap_or(candidate.severity);
        if demoted {
            severity = severity.min(Severity::Warning);
        }
        let tags = self
            .rules
            .lookup_by_id(&candidate.rule_id)
            .map(|e| e.descriptor().tags.clone())
            .unwrap_or_default();
        Some(Diagnostic {
            profile: self
                .profiles
                .lowest_containing(&candidate.rule_id)
                .map(str::to_string),
            rule_id: candidate.rule_id,
            sub_tag: candidate.sub_tag,
            severity,
            location: candidate.location,
            message: candidate.message,
            tags,
        })
    }
}
