//! Text (terminal) reporter with colors and formatting

use crate::pipeline::{RepositoryOutcome, RepositoryStatus, RunReport, RunStatus};
use anyhow::Result;
use console::style;

/// Authors listed per repository before truncating
const MAX_AUTHORS: usize = 15;

/// Render report as formatted terminal output
pub fn render(report: &RunReport) -> Result<String> {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{}\n", style("Impactlens Scoring Run").bold()));
    out.push_str(&format!(
        "{}\n",
        style("──────────────────────────────────────").dim()
    ));

    let status = match report.status {
        RunStatus::Success => style(report.status.as_str()).green().bold(),
        RunStatus::CompletedWithWarnings => style(report.status.as_str()).yellow().bold(),
        RunStatus::Failed => style(report.status.as_str()).red().bold(),
    };
    out.push_str(&format!(
        "Status: {}  Window: {} .. {}",
        status,
        report.window_start.format("%Y-%m-%d"),
        report.started_at.format("%Y-%m-%d")
    ));
    if report.dry_run {
        out.push_str(&format!("  {}", style("(dry run, nothing published)").dim()));
    }
    out.push_str("\n\n");

    let s = &report.summary;
    out.push_str(&format!("{}\n", style("SUMMARY").bold()));
    out.push_str(&format!(
        "  Repositories: {} total, {} scored, {} failed\n",
        s.repositories_total, s.repositories_scored, s.repositories_failed
    ));
    out.push_str(&format!(
        "  Scores: {} computed, {} published",
        s.scores_computed, s.scores_published
    ));
    if s.publish_failures > 0 {
        out.push_str(&format!(
            ", {}",
            style(format!("{} failed to publish", s.publish_failures)).red()
        ));
    }
    out.push_str("\n\n");

    for outcome in &report.repositories {
        render_repository(&mut out, outcome);
    }

    Ok(out)
}

fn render_repository(out: &mut String, outcome: &RepositoryOutcome) {
    out.push_str(&format!("{}", style(&outcome.repository).bold()));
    match &outcome.status {
        RepositoryStatus::Failed { reason } => {
            out.push_str(&format!("  {}\n\n", style(format!("skipped: {reason}")).red()));
            return;
        }
        RepositoryStatus::Empty => {
            out.push_str(&format!("  {}\n\n", style("no commits in window").dim()));
            return;
        }
        RepositoryStatus::Scored => {
            out.push_str(&format!(
                "  {}\n",
                style(format!(
                    "{} commits, {} authors",
                    outcome.commits,
                    outcome.authors.len()
                ))
                .dim()
            ));
        }
    }

    out.push_str(&format!(
        "{}\n",
        style("    #  SCORE   RAW    AUTHOR                          LINES  COMMITS").dim()
    ));
    for (i, author) in outcome.authors.iter().take(MAX_AUTHORS).enumerate() {
        let name = truncate(&author.canonical_name, 30);
        let marker = if author.estimated { "*" } else { " " };
        out.push_str(&format!(
            "  {:>3}  {}{} {:.3}  {:<30}  {:>6}  {:>7}\n",
            i + 1,
            format_score(author.score),
            marker,
            author.raw,
            name,
            author.lines_changed,
            author.commit_count
        ));
    }

    let remaining = outcome.authors.len().saturating_sub(MAX_AUTHORS);
    if remaining > 0 {
        out.push_str(&format!(
            "\n  {}\n",
            style(format!("...and {remaining} more (use --format json)")).dim()
        ));
    }
    if outcome.authors.iter().any(|a| a.estimated) {
        out.push_str(&format!(
            "  {}\n",
            style("* some factors fell back to the neutral 0.5").dim()
        ));
    }
    for failure in &outcome.publish_failures {
        out.push_str(&format!(
            "  {} {}: {}\n",
            style("publish failed").red(),
            failure.id,
            failure.reason
        ));
    }
    out.push('\n');
}

/// Truncate on char boundaries
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    }
}

fn format_score(score: f64) -> String {
    let text = format!("{:.3}", score);
    let styled = if score >= 0.7 {
        style(text).green()
    } else if score >= 0.4 {
        style(text).yellow()
    } else {
        style(text).red()
    };
    styled.to_string()
}
