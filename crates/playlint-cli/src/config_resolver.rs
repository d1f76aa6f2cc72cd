//! Configuration file lookup.
//!
//! Order:
//!
//! 1. `--config` flag or `$PLAYLINT_CONFIG`, taken as-is
//! 2. `playlint.toml`, `.playlint.toml` or `.config/playlint.toml` in the
//!    project directory, then in each parent up to the repository root
//!    (the first directory holding `.git`)
//! 3. `config.toml` in the global directory (`$PLAYLINT_CONFIG_DIR`,
//!    else `~/.playlint/`)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given on the command line or in the environment.
    Explicit(PathBuf),
    /// Found in the project directory or one of its parents.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found; defaults apply.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Returns `true` if the config came from the global directory.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

/// Candidate names inside a project directory, in priority order.
const PROJECT_CONFIG_NAMES: &[&str] = &["playlint.toml", ".playlint.toml", ".config/playlint.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration for a run rooted at `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    let start = std::fs::canonicalize(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
    resolve_from(&start, explicit, global_config_dir().as_deref())
}

fn resolve_from(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<&Path>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = search_upwards(project_dir) {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    global_dir
        .map(|dir| dir.join(GLOBAL_CONFIG_NAME))
        .filter(|candidate| candidate.is_file())
        .map_or(ConfigSource::Default, |candidate| {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        })
}

/// Looks for a project config in `dir` and its ancestors, stopping after
/// the repository root.
fn search_upwards(dir: &Path) -> Option<PathBuf> {
    for current in dir.ancestors() {
        if let Some(found) = PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| current.join(name))
            .find(|candidate| candidate.is_file())
        {
            return Some(found);
        }
        if current.join(".git").exists() {
            break;
        }
    }
    None
}

/// Global config directory: `$PLAYLINT_CONFIG_DIR`, else `~/.playlint/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PLAYLINT_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".playlint"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A repository with `.git` at its root and a nested project directory.
    fn repo() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".git")).unwrap();
        let project = tmp.path().join("ops/site");
        fs::create_dir_all(&project).unwrap();
        (tmp, project)
    }

    #[test]
    fn explicit_wins_and_is_not_checked() {
        let (_tmp, project) = repo();
        fs::write(project.join("playlint.toml"), "").unwrap();
        let result = resolve_from(&project, Some(Path::new("/nonexistent.toml")), None);
        assert_eq!(result, ConfigSource::Explicit(PathBuf::from("/nonexistent.toml")));
    }

    #[test]
    fn project_names_in_priority_order() {
        let (_tmp, project) = repo();
        fs::create_dir(project.join(".config")).unwrap();
        fs::write(project.join(".config/playlint.toml"), "").unwrap();
        assert_eq!(
            resolve_from(&project, None, None),
            ConfigSource::Project(project.join(".config/playlint.toml"))
        );

        fs::write(project.join(".playlint.toml"), "").unwrap();
        fs::write(project.join("playlint.toml"), "").unwrap();
        assert_eq!(
            resolve_from(&project, None, None),
            ConfigSource::Project(project.join("playlint.toml"))
        );
    }

    #[test]
    fn parent_directories_are_searched_up_to_the_repository_root() {
        let (tmp, project) = repo();
        fs::write(tmp.path().join(".playlint.toml"), "").unwrap();
        assert_eq!(
            resolve_from(&project, None, None),
            ConfigSource::Project(tmp.path().join(".playlint.toml"))
        );
    }

    #[test]
    fn search_stops_at_the_repository_root() {
        let outer = TempDir::new().unwrap();
        fs::write(outer.path().join("playlint.toml"), "").unwrap();
        let root = outer.path().join("repo");
        fs::create_dir_all(root.join(".git")).unwrap();
        assert_eq!(resolve_from(&root, None, None), ConfigSource::Default);
    }

    #[test]
    fn global_fallback_only_without_project_config() {
        let (_tmp, project) = repo();
        let global = TempDir::new().unwrap();
        assert_eq!(
            resolve_from(&project, None, Some(global.path())),
            ConfigSource::Default
        );

        fs::write(global.path().join("config.toml"), "").unwrap();
        let result = resolve_from(&project, None, Some(global.path()));
        assert!(result.is_global());
        assert_eq!(result.path(), Some(global.path().join("config.toml").as_path()));

        fs::write(project.join("playlint.toml"), "").unwrap();
        assert!(matches!(
            resolve_from(&project, None, Some(global.path())),
            ConfigSource::Project(_)
        ));
    }
}
