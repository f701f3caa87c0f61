//! CLI command definitions and handlers

mod doctor;
mod init;
mod projects;
mod score;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{load_config, ImpactConfig, SourceKind, UserConfig};
use crate::reporters::OutputFormat;

/// Impactlens - contributor impact scoring
#[derive(Parser, Debug)]
#[command(name = "impactlens")]
#[command(
    version,
    about = "Contributor impact scores from git activity: co-change PageRank, multi-factor metrics, one number per author",
    long_about = "Impactlens reads the commits of a set of repositories, weights every file by its \
PageRank in the co-change graph, and combines complexity, change volume, lifespan, coupling \
and code quality signals into one score in [0, 1] per contributor.\n\n\
Scores are upserted into Elasticsearch next to the GrimoireLab git index.",
    after_help = "\
Examples:
  impactlens score                                 Score every repository in projects.json
  impactlens score https://github.com/org/repo     Score one repository
  impactlens score --events commits.json --dry-run Offline run over a JSON export
  impactlens projects add project.json             Register repositories
  impactlens doctor                                Check config, projects file and store"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: impactlens.toml or .impactlensrc.json in the working directory)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute impact scores and publish them
    #[command(after_help = "\
Examples:
  impactlens score                                       Repositories from the projects file
  impactlens score /srv/clones/app --source git          Read a local clone with libgit2
  impactlens score --events tests/fixtures/events.json   Commit events from a JSON file
  impactlens score --since-days 90 --format json         Wider window, JSON output
  impactlens score --dry-run                             Compute and report, publish nothing")]
    Score {
        /// Repository origins (default: every repository in the projects file)
        #[arg(value_name = "REPO")]
        repositories: Vec<String>,

        /// Read commit events from a JSON file (implies --source json)
        #[arg(long, value_name = "FILE")]
        events: Option<PathBuf>,

        /// Event source: elasticsearch, git, json (default: from config)
        #[arg(long, value_parser = ["elasticsearch", "es", "git", "json"])]
        source: Option<String>,

        /// Lookback window in days (default: from config, 30)
        #[arg(long)]
        since_days: Option<u32>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Write the report to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Compute and report without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the projects file (GrimoireLab projects.json)
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Write an example impactlens.toml in the working directory
    Init,

    /// Check config, projects file and store connectivity
    Doctor,

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsAction {
    /// Merge projects from a JSON file (`-` reads stdin)
    Add {
        #[arg(value_name = "FILE")]
        file: String,
    },
    /// List registered projects and their repositories
    List,
}

/// Engine config with user-level settings and environment overrides applied
fn load_effective_config(explicit: Option<&Path>) -> Result<ImpactConfig> {
    let cwd = std::env::current_dir()?;
    let mut config = load_config(explicit, &cwd)?;
    UserConfig::load().apply(&mut config);
    Ok(config)
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Score {
            repositories,
            events,
            source,
            since_days,
            format,
            output,
            dry_run,
        } => {
            let config = load_effective_config(cli.config.as_deref())?;
            let options = score::ScoreOptions {
                repositories,
                events,
                source: source.map(|s| s.parse::<SourceKind>()).transpose()?,
                since_days,
                format: format.parse::<OutputFormat>()?,
                output,
                dry_run,
            };
            score::run(config, options)
        }

        Commands::Projects { action } => {
            let config = load_effective_config(cli.config.as_deref())?;
            match action {
                ProjectsAction::Add { file } => projects::add(&config, &file),
                ProjectsAction::List => projects::list(&config),
            }
        }

        Commands::Init => init::run(&std::env::current_dir()?),

        Commands::Doctor => {
            let config = load_effective_config(cli.config.as_deref())?;
            doctor::run(&config)
        }

        Commands::Version => {
            println!("impactlens {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
