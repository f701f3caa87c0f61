//! Init command - write an example impactlens.toml

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

const EXAMPLE_CONFIG: &str = r#"# Impactlens Configuration

[window]
# Commits older than this are ignored
lookback_days = 30

[pagerank]
damping = 0.85
max_iterations = 100
tolerance = 1e-6

[scoring]
# What to do when a maximum is zero: "double-value" or "unit"
normalization_fallback = "double-value"
bug_fix_keywords = ["fix", "bug", "issue", "solve"]

[scoring.file_weights]
complexity = 0.15
changes = 0.25
lifespan = 0.05
coupling = 0.05

[scoring.author_weights]
lines_changed = 0.20
commit_frequency = 0.15
code_quality = 0.10
review_participation = 0.05

[source]
# elasticsearch, git or json
kind = "elasticsearch"
# clone_root = "/srv/clones"
# events_file = "commits.json"

[store]
url = "http://localhost:9200"
commits_index = "git"
scores_index = "impact_scores"
batch_size = 500
# Credentials: IMPACTLENS_STORE_USER / IMPACTLENS_STORE_PASSWORD

[identity]
# "none" or "http"
lookup = "none"
# url_template = "https://api.github.com/users/{id}"
# token_env = "GITHUB_TOKEN"

[projects]
file = "projects.json"
"#;

/// Run the init command
pub fn run(dir: &Path) -> Result<()> {
    let config_path = dir.join("impactlens.toml");

    if config_path.exists() {
        println!(
            "{} Already initialized: {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to create {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!(
        "\nNext: register repositories with {} and run {}",
        style("impactlens projects add <file>").bold(),
        style("impactlens score").bold()
    );
    Ok(())
}
