//! Rule registry: descriptors, aliases, tags and matchers.

use std::collections::{BTreeMap, HashMap};

use crate::ids;
use crate::rule::{Matcher, RuleDescriptor};
use crate::types::Severity;

/// Errors raised while building a rule set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two rules share an id.
    #[error("rule '{id}' is registered twice")]
    DuplicateRule {
        /// The repeated id.
        id: String,
    },

    /// An alias collides with another rule's id or alias.
    #[error("alias '{alias}' of rule '{rule}' is already used by '{existing}'")]
    AliasConflict {
        /// The colliding alias.
        alias: String,
        /// Rule declaring the alias.
        rule: String,
        /// Rule already owning the name.
        existing: String,
    },
}

/// A registered rule.
#[derive(Debug)]
pub struct RuleEntry {
    descriptor: RuleDescriptor,
    matcher: Option<Matcher>,
}

impl RuleEntry {
    /// Metadata of the rule.
    #[must_use]
    pub fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    /// Matcher, absent for rules emitted by the engine itself.
    #[must_use]
    pub fn matcher(&self) -> Option<&Matcher> {
        self.matcher.as_ref()
    }

    /// Canonical id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

/// Set of rules available to one run. Passed explicitly, never global.
#[derive(Debug, Default)]
pub struct RuleSet {
    entries: Vec<RuleEntry>,
    names: HashMap<String, usize>,
    tags: BTreeMap<String, Vec<usize>>,
}

impl RuleSet {
    /// Creates a set holding only the engine's own rules.
    #[must_use]
    pub fn new() -> Self {
        let mut set = Self::empty();
        for descriptor in internal_descriptors() {
            set.push(descriptor, None);
        }
        set
    }

    /// Creates a set with no rules at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken or an alias collides.
    pub fn register(&mut self, matcher: Matcher) -> Result<(), RegistryError> {
        let descriptor = matcher.descriptor();
        self.insert(descriptor, Some(matcher))
    }

    /// Registers metadata for a rule that has no matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is taken or an alias collides.
    pub fn register_descriptor(&mut self, descriptor: RuleDescriptor) -> Result<(), RegistryError> {
        self.insert(descriptor, None)
    }

    fn insert(
        &mut self,
        descriptor: RuleDescriptor,
        matcher: Option<Matcher>,
    ) -> Result<(), RegistryError> {
        self.check_names(&descriptor)?;
        self.push(descriptor, matcher);
        Ok(())
    }

    fn check_names(&self, descriptor: &RuleDescriptor) -> Result<(), RegistryError> {
        if let Some(&idx) = self.names.get(&descriptor.id) {
            let existing = &self.entries[idx].descriptor.id;
            if *existing == descriptor.id {
                return Err(RegistryError::DuplicateRule {
                    id: descriptor.id.clone(),
                });
            }
            return Err(RegistryError::AliasConflict {
                alias: descriptor.id.clone(),
                rule: descriptor.id.clone(),
                existing: existing.clone(),
            });
        }
        for alias in &descriptor.aliases {
            if let Some(&idx) = self.names.get(alias) {
                return Err(RegistryError::AliasConflict {
                    alias: alias.clone(),
                    rule: descriptor.id.clone(),
                    existing: self.entries[idx].descriptor.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Appends a rule whose names are known to be free.
    fn push(&mut self, descriptor: RuleDescriptor, matcher: Option<Matcher>) {
        let idx = self.entries.len();
        self.names.insert(descriptor.id.clone(), idx);
        for alias in &descriptor.aliases {
            self.names.insert(alias.clone(), idx);
        }
        for tag in &descriptor.tags {
            self.tags.entry(tag.clone()).or_default().push(idx);
        }
        tracing::trace!(rule = %descriptor.id, capability = %descriptor.capability, "registered rule");
        self.entries.push(RuleEntry {
            descriptor,
            matcher,
        });
    }

    /// Looks up a rule by id or alias.
    #[must_use]
    pub fn lookup_by_id(&self, name: &str) -> Option<&RuleEntry> {
        self.names.get(name).map(|&idx| &self.entries[idx])
    }

    /// Rules carrying `tag`, in registration order.
    #[must_use]
    pub fn lookup_by_tag(&self, tag: &str) -> Vec<&RuleEntry> {
        self.tags
            .get(tag)
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Resolves an id or alias to the canonical id.
    #[must_use]
    pub fn canonical_id(&self, name: &str) -> Option<&str> {
        self.lookup_by_id(name).map(RuleEntry::id)
    }

    /// Returns true if `name` is a known id, alias or tag.
    #[must_use]
    pub fn knows(&self, name: &str) -> bool {
        self.names.contains_key(name) || self.tags.contains_key(name)
    }

    /// All rules, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &RuleEntry> {
        self.entries.iter()
    }

    /// Fixable rules with a matcher, in ascending id order.
    #[must_use]
    pub fn fixable(&self) -> Vec<&RuleEntry> {
        let mut rules: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.descriptor.fixable && e.matcher.is_some())
            .collect();
        rules.sort_by(|a, b| a.id().cmp(b.id()));
        rules
    }

    /// Every tag in use, sorted.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Checks whether `name` (id, alias or tag, optionally `name[sub]`)
    /// selects a finding of `rule_id` with `sub_tag`.
    #[must_use]
    pub fn selects(&self, name: &str, rule_id: &str, sub_tag: Option<&str>) -> bool {
        let (base, sub) = split_sub_tag(name);
        if let Some(entry) = self.lookup_by_id(base) {
            return entry.id() == rule_id && sub.map_or(true, |s| Some(s) == sub_tag);
        }
        sub.is_none()
            && self
                .lookup_by_id(rule_id)
                .is_some_and(|e| e.descriptor.has_tag(base))
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no rule is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits `id[sub]` into `("id", Some("sub"))`.
#[must_use]
pub fn split_sub_tag(name: &str) -> (&str, Option<&str>) {
    match name.split_once('[') {
        Some((base, rest)) => (base, Some(rest.trim_end_matches(']'))),
        None => (name, None),
    }
}

fn internal_descriptors() -> Vec<RuleDescriptor> {
    vec![
        RuleDescriptor::internal(ids::PARSER_ERROR, "Document is not well-formed", Severity::Error)
            .unsuppressible(),
        RuleDescriptor::internal(
            ids::LOAD_FAILURE,
            "Referenced document could not be loaded",
            Severity::Error,
        )
        .unsuppressible(),
        RuleDescriptor::internal(
            ids::INTERNAL_ERROR,
            "A rule failed while checking a document",
            Severity::Error,
        ),
        RuleDescriptor::internal(
            ids::SUPPRESSION_SYNTAX,
            "Suppression directive could not be understood",
            Severity::Warning,
        ),
        RuleDescriptor::internal(
            ids::FIX_FAILED,
            "Applied fix did not resolve the finding",
            Severity::Error,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LineContext;
    use crate::rule::{Finding, LineRule, Rule};

    struct Named(&'static str, &'static [&'static str]);

    impl Rule for Named {
        fn id(&self) -> &'static str {
            self.0
        }
        fn aliases(&self) -> &'static [&'static str] {
            self.1
        }
        fn tags(&self) -> &'static [&'static str] {
            &["formatting"]
        }
        fn fixable(&self) -> bool {
            true
        }
    }

    impl LineRule for Named {
        fn check_line(&self, _ctx: &LineContext<'_>) -> Vec<Finding> {
            Vec::new()
        }
    }

    #[test]
    fn new_set_holds_internal_rules() {
        let set = RuleSet::new();
        assert_eq!(set.len(), 5);
        let parser = set.lookup_by_id(ids::PARSER_ERROR).unwrap();
        assert!(!parser.descriptor().suppressible);
        assert!(parser.matcher().is_none());
        assert_eq!(set.lookup_by_tag(ids::CORE_TAG).len(), 5);
    }

    #[test]
    fn engine_rule_ids_cannot_be_registered_again() {
        let mut set = RuleSet::new();
        for id in [ids::PARSER_ERROR, ids::LOAD_FAILURE, ids::FIX_FAILED] {
            let err = set.register(Matcher::line(Named(id, &[]))).unwrap_err();
            assert!(matches!(err, RegistryError::DuplicateRule { .. }));
        }
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn aliases_resolve_to_canonical_id() {
        let mut set = RuleSet::new();
        set.register(Matcher::line(Named("yaml", &["201"]))).unwrap();
        assert_eq!(set.canonical_id("201"), Some("yaml"));
        assert!(set.knows("formatting"));
        assert!(set.selects("201", "yaml", Some("truthy")));
        assert!(set.selects("yaml[truthy]", "yaml", Some("truthy")));
        assert!(!set.selects("yaml[truthy]", "yaml", Some("line-length")));
        assert!(set.selects("formatting", "yaml", None));
        assert!(!set.selects("unknown", "yaml", None));
    }

    #[test]
    fn duplicate_ids_and_alias_conflicts_are_rejected() {
        let mut set = RuleSet::new();
        set.register(Matcher::line(Named("yaml", &["201"]))).unwrap();
        assert_eq!(
            set.register(Matcher::line(Named("yaml", &[]))),
            Err(RegistryError::DuplicateRule { id: "yaml".into() })
        );
        assert!(matches!(
            set.register(Matcher::line(Named("other", &["201"]))),
            Err(RegistryError::AliasConflict { .. })
        ));
    }

    #[test]
    fn fixable_rules_sorted_by_id() {
        let mut set = RuleSet::new();
        set.register(Matcher::line(Named("yaml", &[]))).unwrap();
        set.register(Matcher::line(Named("eof", &[]))).unwrap();
        let ids: Vec<_> = set.fixable().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["eof", "yaml"]);
    }
}
