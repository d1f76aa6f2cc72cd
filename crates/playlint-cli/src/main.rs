//! playlint CLI tool.
//!
//! Usage:
//! ```bash
//! playlint check [OPTIONS] [PATHS]...
//! playlint fix [--dry-run] [PATHS]...
//! playlint list-rules
//! playlint list-profiles
//! playlint init
//! ```

use clap::{Parser, Subcommand};
use playlint_core::RunOutcome;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Linter for automation playbooks, task files and roles
#[derive(Parser)]
#[command(name = "playlint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "PLAYLINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run lint checks
    Check {
        #[command(flatten)]
        lint: LintArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Apply automatic fixes, then report what is left
    Fix {
        #[command(flatten)]
        lint: LintArgs,

        /// Compute fixes without writing files
        #[arg(long)]
        dry_run: bool,

        /// Output format for the remaining diagnostics
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List available rules
    ListRules,

    /// List the profile ladder
    ListProfiles,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by `check` and `fix`.
#[derive(Debug, Clone, clap::Args)]
pub struct LintArgs {
    /// Files or directories to lint (default: the project directory)
    pub paths: Vec<PathBuf>,

    /// Project root: config lookup, relative paths and roles resolve here
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Profile to run (overrides the config file)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Rules, tags or `rule[sub]` to skip (can be specified multiple times)
    #[arg(short = 'x', long)]
    pub skip: Vec<String>,

    /// Rules, tags or `rule[sub]` to only warn about
    #[arg(short, long)]
    pub warn: Vec<String>,

    /// Opt-in rules to enable
    #[arg(long)]
    pub enable: Vec<String>,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-diagnostic compact format.
    Compact,
    /// Source snippets rendered with miette.
    Pretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Commands::Check { lint, format } => {
            let source = config_resolver::resolve(&lint.project_dir, cli.config.as_deref());
            commands::check::run(&lint, format, &source)
        }
        Commands::Fix {
            lint,
            dry_run,
            format,
        } => {
            let source = config_resolver::resolve(&lint.project_dir, cli.config.as_deref());
            commands::fix::run(&lint, dry_run, format, &source)
        }
        Commands::ListRules => commands::list_rules::run().map(|()| RunOutcome::Success),
        Commands::ListProfiles => commands::list_profiles::run().map(|()| RunOutcome::Success),
        Commands::Init { force } => commands::init::run(force).map(|()| RunOutcome::Success),
    };

    let outcome = outcome.unwrap_or_else(|err| {
        eprintln!("error: {err:#}");
        RunOutcome::EngineFailure
    });
    ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(u8::MAX))
}
