//! Projects command - maintain the GrimoireLab projects file

use anyhow::{Context, Result};
use console::style;
use serde_json::Value;
use std::io::Read;

use crate::config::projects::normalize_submission;
use crate::config::{ImpactConfig, ProjectRegistry};

/// Merge the projects in `file` (or stdin for `-`) into the projects file
pub fn add(config: &ImpactConfig, file: &str) -> Result<()> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read projects from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?
    };

    let data: Value = serde_json::from_str(&content).context("Project data is not valid JSON")?;
    let projects = normalize_submission(data)
        .context("Invalid project data format (expected {\"<name>\": {\"meta\": ..., \"git\": [...]}})")?;

    let registry = ProjectRegistry::new(&config.projects.file);
    let names = registry.merge_and_save(projects)?;

    for name in &names {
        println!("{} {}", style("✓").green(), style(name).cyan());
    }
    println!(
        "\n{} project(s) saved to {}",
        names.len(),
        style(registry.path().display()).cyan()
    );
    Ok(())
}

/// Print every project and its repositories
pub fn list(config: &ImpactConfig) -> Result<()> {
    let registry = ProjectRegistry::new(&config.projects.file);
    let projects = registry.load()?;

    if projects.is_empty() {
        println!("No projects in {}", registry.path().display());
        return Ok(());
    }

    for (name, project) in &projects {
        println!("{}", style(name).bold());
        let origins = project
            .get("git")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or_default();
        for origin in origins.iter().filter_map(Value::as_str) {
            println!("  {}", origin);
        }
    }
    Ok(())
}
