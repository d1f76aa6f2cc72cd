//! The built-in rule catalog and its profile ladder.

use crate::{EofNewline, Fqcn, Jinja, NameCasing, NameMissing, NoChangedWhen, Yaml};
use playlint_core::{Config, Matcher, RegistryError, RuleSet};

/// Profile ladder, lowest first. Each profile contains every rule of the
/// profiles before it.
pub const PROFILES: &[(&str, &str)] = &[
    ("min", "Engine failures only: documents that cannot be loaded or parsed"),
    ("basic", "Formatting and naming basics every project should follow"),
    ("moderate", "Readability conventions on top of basic"),
    ("safety", "Avoid behaviour that is easy to get wrong"),
    ("shared", "Required for content shared with other teams or published"),
    ("production", "Strictest checks for content deployed to production"),
];

/// Returns every built-in rule, configured from `config`.
#[must_use]
pub fn all_rules(config: &Config) -> Vec<Matcher> {
    let mut yaml = Yaml::new();
    if let Some(rule) = config.rule_config(crate::yaml::NAME) {
        let default = i64::try_from(crate::yaml::DEFAULT_MAX_LINE_LENGTH).unwrap_or(i64::MAX);
        let max = rule.get_int("max_line_length", default);
        yaml = yaml.max_line_length(usize::try_from(max).unwrap_or(crate::yaml::DEFAULT_MAX_LINE_LENGTH));
    }

    vec![
        Matcher::document(EofNewline::new()),
        Matcher::node(Fqcn::new()),
        Matcher::node(Jinja::new()),
        Matcher::node(NameCasing::new()),
        Matcher::node(NameMissing::new()),
        Matcher::node(NoChangedWhen::new()),
        Matcher::line(yaml),
    ]
}

/// Builds the run's rule set: engine rules plus the built-in catalog.
///
/// # Errors
///
/// Returns an error if two rules claim the same id or alias.
pub fn rule_set(config: &Config) -> Result<RuleSet, RegistryError> {
    let mut set = RuleSet::new();
    for matcher in all_rules(config) {
        set.register(matcher)?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playlint_core::Profiles;

    #[test]
    fn catalog_registers_without_conflicts() {
        let set = rule_set(&Config::default()).unwrap();
        assert_eq!(set.lookup_by_id("502").map(|e| e.id()), Some("name-missing"));
        assert_eq!(set.lookup_by_id("201").map(|e| e.id()), Some("yaml"));
        let fixable: Vec<_> = set.fixable().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(fixable, vec!["eof-newline", "fqcn", "jinja", "name-casing", "yaml"]);
    }

    #[test]
    fn profiles_are_cumulative() {
        let set = rule_set(&Config::default()).unwrap();
        let profiles = Profiles::new(PROFILES, &set);
        let basic = profiles.get("basic").unwrap();
        let production = profiles.get("production").unwrap();
        assert!(basic.contains("name-missing"));
        assert!(!basic.contains("fqcn"));
        assert!(basic.rules.is_subset(&production.rules));
        assert!(profiles.get("min").unwrap().rules.is_empty());
        assert_eq!(profiles.lowest_containing("no-changed-when"), Some("shared"));
    }

    #[test]
    fn line_length_is_configurable() {
        let config = Config::parse("[rules.yaml]\nmax_line_length = 10\n").unwrap();
        let set = rule_set(&config).unwrap();
        let engine = playlint_core::Engine::new(&set, playlint_core::Selection::all());
        let doc = crate::testing::document("key: a b c d e f\n");
        let found = engine.check_document(&doc);
        assert!(found.iter().any(|c| c.tag() == "yaml[line-length]"));
    }

    #[test]
    fn catalog_listing() {
        let set = rule_set(&Config::default()).unwrap();
        let listing = set
            .all()
            .filter(|e| !e.descriptor().is_core())
            .map(|e| {
                let d = e.descriptor();
                format!(
                    "{} {} {}",
                    d.id,
                    d.profile.as_deref().unwrap_or("-"),
                    d.default_severity
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        insta::assert_snapshot!(listing, @r"
        eof-newline basic error
        fqcn production warning
        jinja basic warning
        name-casing moderate warning
        name-missing basic error
        no-changed-when shared error
        yaml basic error
        ");
    }
}
