//! Score command - compute and publish contributor impact scores

use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::{ImpactConfig, ProjectRegistry, SourceKind};
use crate::identity::lookup_from_config;
use crate::pipeline::ScoringRun;
use crate::reporters::{report_with_format, OutputFormat};
use crate::store::{ElasticStore, EventSource, GitEventSource, MemoryStore};

pub struct ScoreOptions {
    pub repositories: Vec<String>,
    pub events: Option<PathBuf>,
    pub source: Option<SourceKind>,
    pub since_days: Option<u32>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

/// Open the configured event source.
///
/// The json source also returns the repositories present in its events file,
/// used when neither the command line nor the projects file names any.
fn open_source(
    kind: SourceKind,
    config: &ImpactConfig,
    events: Option<PathBuf>,
) -> Result<(Box<dyn EventSource>, Vec<String>)> {
    match kind {
        SourceKind::Json => {
            let path = events
                .or_else(|| config.source.events_file.clone())
                .context("The json source needs --events <FILE> or source.events_file")?;
            let store = MemoryStore::from_json_file(&path)?;
            let repositories = store.repositories();
            debug!(
                "Loaded events for {} repositories from {}",
                repositories.len(),
                path.display()
            );
            Ok((Box::new(store), repositories))
        }
        SourceKind::Git => Ok((
            Box::new(GitEventSource::new(config.source.clone_root.clone())),
            Vec::new(),
        )),
        SourceKind::Elasticsearch => Ok((Box::new(ElasticStore::new(&config.store)), Vec::new())),
    }
}

/// Repositories from the command line, else the projects file, else the events file
fn resolve_repositories(
    explicit: Vec<String>,
    config: &ImpactConfig,
    from_source: Vec<String>,
) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    let registry = ProjectRegistry::new(&config.projects.file);
    if registry.path().exists() || from_source.is_empty() {
        return registry.repositories().with_context(|| {
            "No repositories given and the projects file could not be read \
             (pass REPO arguments or run `impactlens projects add`)"
        });
    }
    info!(
        "{} not found, scoring every repository in the events file",
        registry.path().display()
    );
    Ok(from_source)
}

/// Run the score command
pub fn run(mut config: ImpactConfig, options: ScoreOptions) -> Result<()> {
    if let Some(days) = options.since_days {
        config.window.lookback_days = days;
    }
    let kind = if options.events.is_some() {
        SourceKind::Json
    } else {
        options.source.unwrap_or(config.source.kind)
    };

    let (source, known) = open_source(kind, &config, options.events)?;
    let repositories = resolve_repositories(options.repositories, &config, known)?;
    if repositories.is_empty() {
        anyhow::bail!("No repositories to score");
    }

    let lookup = lookup_from_config(&config.identity);
    let sink = ElasticStore::new(&config.store);

    let mut run = ScoringRun::new(&config, source.as_ref(), lookup.as_ref());
    if !options.dry_run {
        debug!("Publishing to {}/{}", sink.base_url(), config.store.scores_index);
        run = run.with_sink(&sink);
    }
    let report = run.execute(&repositories);

    let rendered = report_with_format(&report, options.format)?;
    match &options.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{rendered}"),
    }

    if report.is_failed() {
        eprintln!(
            "{} No score could be published to {}",
            style("✗").red(),
            sink.base_url()
        );
        std::process::exit(1);
    }
    Ok(())
}
