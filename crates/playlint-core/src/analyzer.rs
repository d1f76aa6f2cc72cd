//! Core analyzer for orchestrating lint execution.

use crate::aggregate::Aggregator;
use crate::autofix::{write_atomic, FileFix, FixError, FixPipeline, FixReport};
use crate::classify::Classifier;
use crate::config::Config;
use crate::document::{DocumentRegistry, SourceDocument};
use crate::engine::{parse_failure_candidate, Engine, Selection};
use crate::loader::{LoadError, Loader, Resolution};
use crate::profile::{Profile, Profiles};
use crate::registry::{RegistryError, RuleSet};
use crate::rule::Matcher;
use crate::suppression::{IgnoreFile, SuppressionResolver, Verdict};
use crate::types::{LintResult, MatchCandidate};

use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Default ignore file name, looked up in the project root.
pub const IGNORE_FILE: &str = ".playlint-ignore";

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error walking the project tree.
    #[error("Failed to walk files: {0}")]
    Walk(#[from] ignore::Error),

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Rule registration error.
    #[error("Rule registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A root document could not be loaded.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// Fixed text could not be written.
    #[error("{0}")]
    Fix(#[from] FixError),

    /// The configured profile does not exist.
    #[error("Unknown profile '{name}' (available: {available})")]
    UnknownProfile {
        /// Requested profile.
        name: String,
        /// Known profiles, comma separated.
        available: String,
    },
}

/// Shared flag for stopping a run early.
///
/// Work already started finishes; documents not yet started are skipped and
/// the result is marked as cancelled.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    paths: Vec<PathBuf>,
    rule_set: Option<RuleSet>,
    rules: Vec<Matcher>,
    profiles: Vec<(String, String)>,
    exclude_patterns: Vec<String>,
    ignore_file: Option<PathBuf>,
    config: Option<Config>,
    cancellation: Option<Cancellation>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project root.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds a file or directory to lint. Without paths the root is linted.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Adds several files or directories to lint.
    #[must_use]
    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Uses a prepared rule set.
    #[must_use]
    pub fn rule_set(mut self, rules: RuleSet) -> Self {
        self.rule_set = Some(rules);
        self
    }

    /// Adds a rule on top of the rule set.
    #[must_use]
    pub fn rule(mut self, matcher: Matcher) -> Self {
        self.rules.push(matcher);
        self
    }

    /// Sets the profile ladder as `(name, description)` pairs, lowest first.
    #[must_use]
    pub fn profiles<I, N, D>(mut self, ladder: I) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<String>,
    {
        self.profiles = ladder
            .into_iter()
            .map(|(n, d)| (n.into(), d.into()))
            .collect();
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Overrides the ignore file location.
    #[must_use]
    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = Some(path.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Shares a cancellation flag with the analyzer.
    #[must_use]
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule cannot be registered, a glob is invalid,
    /// the profile is unknown or the ignore file cannot be read.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();
        let root = self
            .root
            .unwrap_or_else(|| config.analyzer.root.clone());
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };
        let root = std::fs::canonicalize(&root).unwrap_or(root);

        let mut rules = self.rule_set.unwrap_or_else(RuleSet::new);
        for matcher in self.rules {
            rules.register(matcher)?;
        }

        let ladder: Vec<(&str, &str)> = self
            .profiles
            .iter()
            .map(|(n, d)| (n.as_str(), d.as_str()))
            .collect();
        let profiles = Profiles::new(&ladder, &rules);
        if let Some(name) = &config.profile {
            if profiles.get(name).is_none() {
                return Err(AnalyzerError::UnknownProfile {
                    name: name.clone(),
                    available: profiles.names().collect::<Vec<_>>().join(", "),
                });
            }
        }

        let exclude = self
            .exclude_patterns
            .iter()
            .chain(&config.exclude_paths)
            .map(|p| glob::Pattern::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        let ignore_rel = self
            .ignore_file
            .or_else(|| config.analyzer.ignore_file.clone())
            .unwrap_or_else(|| PathBuf::from(IGNORE_FILE));
        let ignore_abs = if ignore_rel.is_absolute() {
            ignore_rel.clone()
        } else {
            root.join(&ignore_rel)
        };
        let ignore = IgnoreFile::load(&ignore_abs, ignore_rel)?;

        let selection = Selection::from_config(&rules, &config);

        Ok(Analyzer {
            root,
            paths: self.paths,
            rules,
            profiles,
            exclude,
            ignore,
            selection,
            config,
            cancellation: self.cancellation.unwrap_or_default(),
        })
    }
}

/// The main analyzer that orchestrates lint execution.
///
/// Use [`Analyzer::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Analyzer {
    root: PathBuf,
    paths: Vec<PathBuf>,
    rules: RuleSet,
    profiles: Profiles,
    exclude: Vec<glob::Pattern>,
    ignore: Option<IgnoreFile>,
    selection: Selection,
    config: Config,
    cancellation: Cancellation,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the rule set.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the profile ladder.
    #[must_use]
    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the cancellation flag of this analyzer.
    #[must_use]
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    fn active_profile(&self) -> Option<&Profile> {
        self.config
            .profile
            .as_deref()
            .and_then(|name| self.profiles.get(name))
    }

    /// Analyzes all documents and returns the results.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or a root document cannot be read.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {:?}", self.root);
        let files = self.discover_files()?;
        info!("Found {} documents to analyze", files.len());

        let loader = Loader::new(&self.root, &self.config.roles_path);
        let result = self.run(&loader, &files, Vec::new())?;

        info!(
            "Analysis complete: {} diagnostics in {} documents",
            result.diagnostics.len(),
            result.files_checked
        );
        Ok(result)
    }

    /// Applies fixes, writes changed documents (unless `dry_run`) and
    /// analyzes the fixed text. Only documents under the project root are
    /// fixed.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery, loading or writing fails.
    pub fn fix(&self, dry_run: bool) -> Result<(FixReport, LintResult), AnalyzerError> {
        info!("Starting fix at {:?} (dry run: {dry_run})", self.root);
        let roots = self.discover_files()?;
        let loader = Loader::new(&self.root, &self.config.roles_path);
        self.resolve_all(&loader, &roots)?;
        let documents = loader.registry();

        let resolver = SuppressionResolver::new(&self.rules, &self.config, self.ignore.as_ref());
        let classifier =
            Classifier::new(&self.rules, &self.profiles, self.active_profile(), &self.config);
        let pipeline =
            FixPipeline::new(&self.rules, &self.selection, &resolver, &classifier, &self.config);
        debug!(
            writers = ?pipeline.writers().iter().map(|e| e.id()).collect::<Vec<_>>(),
            "fixable rules"
        );

        // Documents reached through roles_path or absolute includes are
        // linted but never written.
        let targets: Vec<_> = self
            .checked_documents(&documents)
            .into_iter()
            .filter(|doc| {
                let inside = doc.path().starts_with(loader.root());
                if !inside {
                    debug!("Not fixing outside the project: {}", doc.path().display());
                }
                inside
            })
            .collect();
        let fixes: Vec<Option<FileFix>> = self.map_items(&targets, |doc| {
            (!self.cancellation.is_cancelled()).then(|| pipeline.fix_document(doc))
        });
        let mut files: Vec<FileFix> = fixes.into_iter().flatten().collect();
        files.sort_by(|a, b| a.relative.cmp(&b.relative));

        if !dry_run {
            for file in files.iter().filter(|f| f.changed()) {
                write_atomic(&file.path, &file.fixed)?;
                info!("Fixed {}", file.relative.display());
            }
        }

        let overlay: HashMap<PathBuf, String> = files
            .iter()
            .filter(|f| f.changed())
            .map(|f| (f.path.clone(), f.fixed.clone()))
            .collect();
        let failures: Vec<MatchCandidate> = files
            .iter()
            .flat_map(|f| f.failures.iter().cloned())
            .collect();

        let reloaded = Loader::new(&self.root, &self.config.roles_path).with_overlay(overlay);
        let result = self.run(&reloaded, &roots, failures)?;
        Ok((FixReport { files, dry_run }, result))
    }

    fn run(
        &self,
        loader: &Loader,
        files: &[PathBuf],
        extra: Vec<MatchCandidate>,
    ) -> Result<LintResult, AnalyzerError> {
        let resolutions = self.resolve_all(loader, files)?;
        let documents = loader.registry();
        Ok(self.check(&resolutions, &documents, extra))
    }

    fn resolve_all(
        &self,
        loader: &Loader,
        files: &[PathBuf],
    ) -> Result<Vec<Resolution>, AnalyzerError> {
        let resolved: Vec<Option<Result<Resolution, LoadError>>> = self.map_items(files, |path| {
            (!self.cancellation.is_cancelled()).then(|| loader.resolve(path))
        });
        let mut out = Vec::with_capacity(resolved.len());
        for resolution in resolved.into_iter().flatten() {
            out.push(resolution?);
        }
        Ok(out)
    }

    fn check(
        &self,
        resolutions: &[Resolution],
        documents: &DocumentRegistry,
        extra: Vec<MatchCandidate>,
    ) -> LintResult {
        let engine = Engine::new(&self.rules, self.selection.clone());
        let targets = self.checked_documents(documents);

        let per_document = self.map_items(&targets, |doc| {
            if self.cancellation.is_cancelled() {
                return Vec::new();
            }
            let mut found = engine.check_document(doc);
            found.extend(parse_failure_candidate(doc));
            found
        });
        let per_tree = self.map_items(resolutions, |resolution| {
            if self.cancellation.is_cancelled() {
                return Vec::new();
            }
            let mut found = engine.check_forest(&resolution.forest, documents);
            found.extend(resolution.failures.iter().cloned());
            found
        });

        let resolver = SuppressionResolver::new(&self.rules, &self.config, self.ignore.as_ref());
        let classifier =
            Classifier::new(&self.rules, &self.profiles, self.active_profile(), &self.config);

        let candidates = per_document
            .into_iter()
            .flatten()
            .chain(per_tree.into_iter().flatten())
            .chain(extra)
            .chain(resolver.syntax_candidates(documents));

        let mut aggregator = Aggregator::new();
        aggregator.merge(candidates.filter_map(|candidate| {
            if self.is_excluded(&candidate.location.file) {
                return None;
            }
            let document = candidate
                .document
                .and_then(|id| documents.get(id))
                .map(AsRef::as_ref);
            match resolver.verdict(&candidate, document) {
                Verdict::Suppressed(origin) => {
                    debug!(rule = %candidate.tag(), ?origin, "suppressed");
                    None
                }
                Verdict::Demote => classifier.classify(candidate, true),
                Verdict::Keep => classifier.classify(candidate, false),
            }
        }));
        aggregator.finish(targets.len(), self.cancellation.is_cancelled())
    }

    /// Documents that are linted: every loaded document outside the excludes.
    fn checked_documents<'d>(&self, documents: &'d DocumentRegistry) -> Vec<&'d Arc<SourceDocument>> {
        documents
            .documents()
            .into_iter()
            .filter(|d| !self.is_excluded(d.relative_path()))
            .collect()
    }

    fn map_items<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.config.analyzer.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Discovers the YAML documents to analyze.
    fn discover_files(&self) -> Result<Vec<PathBuf>, AnalyzerError> {
        let targets = if self.paths.is_empty() {
            vec![self.root.clone()]
        } else {
            self.paths
                .iter()
                .map(|p| if p.is_absolute() { p.clone() } else { self.root.join(p) })
                .collect()
        };

        let mut files = Vec::new();
        for target in targets {
            if target.is_file() {
                files.push(target);
                continue;
            }
            if !target.is_dir() {
                return Err(AnalyzerError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", target.display()),
                )));
            }
            let respect = self.config.analyzer.respect_gitignore;
            let walker = ignore::WalkBuilder::new(&target)
                .git_ignore(respect)
                .git_exclude(respect)
                .ignore(respect)
                .require_git(false)
                .build();
            for entry in walker {
                let entry = entry?;
                let path = entry.path();
                if !entry.file_type().is_some_and(|t| t.is_file()) || !is_yaml(path) {
                    continue;
                }
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                if self.is_excluded(relative) {
                    debug!("Excluding: {}", path.display());
                    continue;
                }
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Checks if a root-relative path is excluded.
    fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.iter().any(|p| {
            p.matches_path(relative)
                || relative
                    .ancestors()
                    .skip(1)
                    .any(|dir| !dir.as_os_str().is_empty() && p.matches_path(dir))
        })
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml" | "yaml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeContext;
    use crate::rule::{Finding, NodeRule, Rule};
    use crate::types::Severity;
    use std::fs;

    struct Unnamed;
    impl Rule for Unnamed {
        fn id(&self) -> &'static str {
            "unnamed"
        }
        fn profile(&self) -> Option<&'static str> {
            Some("strict")
        }
    }
    impl NodeRule for Unnamed {
        fn check_node(&self, ctx: &NodeContext<'_>) -> Vec<Finding> {
            if ctx.node().kind.is_task_like() && ctx.node().name().is_none() {
                vec![Finding::new("unnamed task")]
            } else {
                vec![]
            }
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("site.yml"), "- hosts: all\n  tasks:\n    - debug: {}\n").unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/x.yml"), "- debug: {}\n").unwrap();
        fs::write(dir.path().join("README.md"), "- debug: {}\n").unwrap();
        dir
    }

    fn builder(dir: &Path) -> AnalyzerBuilder {
        Analyzer::builder()
            .root(dir)
            .rule(Matcher::node(Unnamed))
            .profiles([("basic", ""), ("strict", "")])
    }

    #[test]
    fn analyzes_yaml_documents_and_respects_excludes() {
        let dir = project();
        let analyzer = builder(dir.path()).exclude("vendor").build().unwrap();
        let result = analyzer.analyze().unwrap();
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.location.file, PathBuf::from("site.yml"));
        assert_eq!(d.location.line, 3);
        assert_eq!(d.profile.as_deref(), Some("strict"));
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn profile_filters_rules() {
        let dir = project();
        let config = Config {
            profile: Some("basic".into()),
            ..Config::default()
        };
        let analyzer = builder(dir.path()).config(config).build().unwrap();
        assert!(analyzer.analyze().unwrap().diagnostics.is_empty());
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let dir = project();
        let config = Config {
            profile: Some("nope".into()),
            ..Config::default()
        };
        let err = builder(dir.path()).config(config).build().unwrap_err();
        assert!(matches!(err, AnalyzerError::UnknownProfile { .. }));
    }

    #[test]
    fn cancelled_run_is_marked() {
        let dir = project();
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let analyzer = builder(dir.path())
            .cancellation(cancellation)
            .build()
            .unwrap();
        let result = analyzer.analyze().unwrap();
        assert!(result.cancelled);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = project();
        let analyzer = builder(dir.path()).path("absent.yml").build().unwrap();
        assert!(matches!(analyzer.analyze(), Err(AnalyzerError::Io(_))));
    }

    #[test]
    fn exclude_matches_directories() {
        let dir = project();
        let analyzer = builder(dir.path()).exclude("vendor").build().unwrap();
        assert!(analyzer.is_excluded(Path::new("vendor/x.yml")));
        assert!(!analyzer.is_excluded(Path::new("site.yml")));
    }
}
