//! GrimoireLab `projects.json` registry
//!
//! The registry is the list of repositories a scoring run covers:
//!
//! ```json
//! {
//!   "impactlens": {
//!     "meta": { "title": "impactlens" },
//!     "git": ["https://github.com/org/impactlens.git"]
//!   }
//! }
//! ```

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const REQUIRED_FIELDS: &[&str] = &["meta", "git"];

/// Handle on a projects file
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
}

impl ProjectRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the projects file
    pub fn load(&self) -> Result<Map<String, Value>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Projects file not found at {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Projects file {} is not valid JSON", self.path.display()))?;
        match value {
            Value::Object(map) if validate_projects(&map) => Ok(map),
            _ => anyhow::bail!(
                "Projects file {} has an invalid format (every project needs 'meta' and 'git')",
                self.path.display()
            ),
        }
    }

    /// Repository origins of every project
    pub fn repositories(&self) -> Result<Vec<String>> {
        Ok(repositories_of(&self.load()?))
    }

    /// Merge `new_projects` over the current file and write it back atomically.
    ///
    /// A missing file starts from an empty registry. Returns the names of the
    /// projects that were added or replaced.
    pub fn merge_and_save(&self, new_projects: Map<String, Value>) -> Result<Vec<String>> {
        if !validate_projects(&new_projects) {
            anyhow::bail!("Invalid project data format");
        }

        let mut current = if self.path.exists() {
            self.load()?
        } else {
            debug!("{} does not exist yet, creating it", self.path.display());
            Map::new()
        };

        let names: Vec<String> = new_projects.keys().cloned().collect();
        current.extend(new_projects);

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "projects.json".to_string());
        let temp_path = dir.join(format!("{file_name}.temp"));

        let body = serde_json::to_string_pretty(&Value::Object(current))?;
        std::fs::write(&temp_path, body)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        info!(
            "Projects file {} updated: {}",
            self.path.display(),
            names.join(", ")
        );
        Ok(names)
    }
}

/// Every project must be an object carrying `meta` and `git`.
pub fn validate(data: &Value) -> bool {
    match data {
        Value::Object(projects) => validate_projects(projects),
        _ => false,
    }
}

fn validate_projects(projects: &Map<String, Value>) -> bool {
    projects.values().all(|project| match project {
        Value::Object(fields) => REQUIRED_FIELDS.iter().all(|f| fields.contains_key(*f)),
        _ => false,
    })
}

/// Accept either the registry format or a single legacy `{meta, git}` project.
///
/// A legacy project is keyed by its lower-cased title with spaces turned
/// into dashes (`default` when untitled).
pub fn normalize_submission(data: Value) -> Option<Map<String, Value>> {
    let Value::Object(map) = data else {
        return None;
    };

    if let (Some(meta), Some(git)) = (map.get("meta"), map.get("git")) {
        let title = meta
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("default");
        let project_id = title.to_lowercase().replace(' ', "-");
        let mut project = Map::new();
        project.insert("meta".to_string(), meta.clone());
        project.insert("git".to_string(), git.clone());
        let mut out = Map::new();
        out.insert(project_id, Value::Object(project));
        return Some(out);
    }

    validate_projects(&map).then_some(map)
}

/// Git origins of every project, deduplicated, in project-key order.
///
/// Entries may carry perceval-style options after the URL
/// (`url --filter-raw=...`); only the URL is kept.
pub fn repositories_of(projects: &Map<String, Value>) -> Vec<String> {
    let mut repos: Vec<String> = Vec::new();
    for project in projects.values() {
        let Some(origins) = project.get("git").and_then(Value::as_array) else {
            continue;
        };
        for origin in origins.iter().filter_map(Value::as_str) {
            let Some(url) = origin.split_whitespace().next() else {
                continue;
            };
            if !repos.iter().any(|r| r == url) {
                repos.push(url.to_string());
            }
        }
    }
    repos
}
