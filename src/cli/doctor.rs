//! Doctor command - check environment

use anyhow::Result;
use console::style;

use crate::config::{ImpactConfig, LookupKind, ProjectRegistry, SourceKind, UserConfig};
use crate::store::ElasticStore;

pub fn run(config: &ImpactConfig) -> Result<()> {
    println!("🩺 Impactlens Doctor\n");
    let mut failures = 0;

    // Projects file
    let registry = ProjectRegistry::new(&config.projects.file);
    match registry.repositories() {
        Ok(repos) => println!(
            "{} Projects file: {} ({} repositories)",
            style("✓").green(),
            registry.path().display(),
            repos.len()
        ),
        Err(e) => {
            failures += 1;
            println!("{} Projects file: {:#}", style("✗").red(), e);
            println!("  Register repositories with `impactlens projects add <file>`");
        }
    }

    // Event source
    match config.source.kind {
        SourceKind::Elasticsearch => println!(
            "{} Event source: elasticsearch index '{}'",
            style("✓").green(),
            config.store.commits_index
        ),
        SourceKind::Git => match &config.source.clone_root {
            Some(root) if !root.is_dir() => {
                failures += 1;
                println!(
                    "{} Event source: clone root {} is not a directory",
                    style("✗").red(),
                    root.display()
                );
            }
            Some(root) => println!(
                "{} Event source: local clones under {}",
                style("✓").green(),
                root.display()
            ),
            None => println!(
                "{} Event source: local clones (repository origins must be paths)",
                style("✓").green()
            ),
        },
        SourceKind::Json => match &config.source.events_file {
            Some(path) if path.is_file() => println!(
                "{} Event source: events file {}",
                style("✓").green(),
                path.display()
            ),
            _ => {
                failures += 1;
                println!(
                    "{} Event source: json needs an existing source.events_file",
                    style("✗").red()
                );
            }
        },
    }

    // Store
    let store = ElasticStore::new(&config.store);
    match store.ping() {
        Ok(version) => println!(
            "{} Store: {} (Elasticsearch {})",
            style("✓").green(),
            store.base_url(),
            version
        ),
        Err(e) => {
            failures += 1;
            println!("{} Store: {} unreachable: {}", style("✗").red(), store.base_url(), e);
            println!("  Set IMPACTLENS_STORE_URL or [store] url in impactlens.toml");
        }
    }

    // Identity lookup (optional)
    match (config.identity.lookup, &config.identity.url_template) {
        (LookupKind::Http, Some(template)) => {
            let has_token = std::env::var(&config.identity.token_env).is_ok();
            println!(
                "{} Identity lookup: {}{}",
                style("✓").green(),
                template,
                if has_token { "" } else { " (no token, rate limits apply)" }
            );
        }
        (LookupKind::Http, None) => {
            println!(
                "{} Identity lookup: http without url_template, disabled",
                style("⚠").yellow()
            );
        }
        (LookupKind::None, _) => println!("○ Identity lookup: none configured"),
    }

    if let Some(path) = UserConfig::user_config_path().filter(|p| p.exists()) {
        println!("○ User config: {}", path.display());
    }

    if failures > 0 {
        anyhow::bail!("{} check(s) failed", failures);
    }
    println!("\n✅ All checks passed!");
    Ok(())
}
