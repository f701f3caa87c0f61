//! Engine configuration support
//!
//! Loads the scoring configuration from `impactlens.toml` or
//! `.impactlensrc.json` in the working directory, or from an explicit path.
//!
//! # Configuration Format
//!
//! ```toml
//! # impactlens.toml
//!
//! [window]
//! lookback_days = 30
//!
//! [pagerank]
//! damping = 0.85
//! max_iterations = 100
//! tolerance = 1e-6
//!
//! [scoring]
//! normalization_fallback = "double-value"
//! bug_fix_keywords = ["fix", "bug", "issue", "solve"]
//!
//! [scoring.file_weights]
//! complexity = 0.15
//! changes = 0.25
//! lifespan = 0.05
//! coupling = 0.05
//!
//! [scoring.author_weights]
//! lines_changed = 0.20
//! commit_frequency = 0.15
//! code_quality = 0.10
//! review_participation = 0.05
//!
//! [source]
//! kind = "elasticsearch"   # or "git", "json"
//!
//! [store]
//! url = "http://localhost:9200"
//! commits_index = "git"
//! scores_index = "impact_scores"
//!
//! [identity]
//! lookup = "http"
//! url_template = "https://api.github.com/users/{id}"
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::metrics::NormalizationFallback;

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ImpactConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub pagerank: PageRankConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// Lookback window for each scoring run
#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_lookback_days() -> u32 {
    30
}

/// PageRank parameters for the file importance graph
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl PageRankConfig {
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.damping)
            && self.max_iterations > 0
            && self.tolerance.is_finite()
            && self.tolerance > 0.0
    }
}

/// Weights of the file-level factors in the composite score
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileWeights {
    pub complexity: f64,
    pub changes: f64,
    pub lifespan: f64,
    pub coupling: f64,
}

impl Default for FileWeights {
    fn default() -> Self {
        Self {
            complexity: 0.15,
            changes: 0.25,
            lifespan: 0.05,
            coupling: 0.05,
        }
    }
}

impl FileWeights {
    pub fn values(&self) -> [f64; 4] {
        [self.complexity, self.changes, self.lifespan, self.coupling]
    }
}

/// Weights of the author-level factors in the composite score
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorWeights {
    pub lines_changed: f64,
    pub commit_frequency: f64,
    pub code_quality: f64,
    pub review_participation: f64,
}

impl Default for AuthorWeights {
    fn default() -> Self {
        Self {
            lines_changed: 0.20,
            commit_frequency: 0.15,
            code_quality: 0.10,
            review_participation: 0.05,
        }
    }
}

impl AuthorWeights {
    pub fn values(&self) -> [f64; 4] {
        [
            self.lines_changed,
            self.commit_frequency,
            self.code_quality,
            self.review_participation,
        ]
    }
}

/// Weights inside the complexity calculator
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComplexityWeights {
    pub line_delta: f64,
    pub imports: f64,
    pub definitions: f64,
}

impl Default for ComplexityWeights {
    fn default() -> Self {
        Self {
            line_delta: 0.4,
            imports: 0.3,
            definitions: 0.3,
        }
    }
}

/// Weights inside the lifespan calculator
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LifespanWeights {
    pub span: f64,
    pub frequency: f64,
    pub contributors: f64,
}

impl Default for LifespanWeights {
    fn default() -> Self {
        Self {
            span: 0.3,
            frequency: 0.4,
            contributors: 0.3,
        }
    }
}

/// Weights inside the code quality calculator
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub bug_fix: f64,
    pub review: f64,
    pub tests: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            bug_fix: 0.4,
            review: 0.3,
            tests: 0.3,
        }
    }
}

/// A weight table is usable when every weight is finite and non-negative
/// and the table carries some mass.
pub fn weights_valid(weights: &[f64]) -> bool {
    weights.iter().all(|w| w.is_finite() && *w >= 0.0) && weights.iter().sum::<f64>() > 0.0
}

/// Scoring customization
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub file_weights: FileWeights,
    #[serde(default)]
    pub author_weights: AuthorWeights,
    #[serde(default)]
    pub complexity: ComplexityWeights,
    #[serde(default)]
    pub lifespan: LifespanWeights,
    #[serde(default)]
    pub quality: QualityWeights,
    /// What `normalize` does when no maximum is known
    #[serde(default)]
    pub normalization_fallback: NormalizationFallback,
    /// Case-insensitive keywords marking a bug-fix commit
    #[serde(default = "default_bug_fix_keywords")]
    pub bug_fix_keywords: Vec<String>,
    /// Case-insensitive trailers attributing review or co-authorship
    #[serde(default = "default_review_markers")]
    pub review_markers: Vec<String>,
    /// Path fragments identifying test files
    #[serde(default = "default_test_path_markers")]
    pub test_path_markers: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            file_weights: FileWeights::default(),
            author_weights: AuthorWeights::default(),
            complexity: ComplexityWeights::default(),
            lifespan: LifespanWeights::default(),
            quality: QualityWeights::default(),
            normalization_fallback: NormalizationFallback::default(),
            bug_fix_keywords: default_bug_fix_keywords(),
            review_markers: default_review_markers(),
            test_path_markers: default_test_path_markers(),
        }
    }
}

fn default_bug_fix_keywords() -> Vec<String> {
    ["fix", "bug", "issue", "solve"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_review_markers() -> Vec<String> {
    ["co-authored-by:", "reviewed-by:", "suggested-by:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_test_path_markers() -> Vec<String> {
    ["test", "spec"].iter().map(|s| s.to_string()).collect()
}

impl ScoringConfig {
    /// Replace every unusable weight table with its defaults
    pub fn validate(&mut self) {
        let composite: Vec<f64> = self
            .file_weights
            .values()
            .into_iter()
            .chain(self.author_weights.values())
            .collect();
        if !weights_valid(&composite) {
            warn!("Invalid composite weights in config, falling back to defaults");
            self.file_weights = FileWeights::default();
            self.author_weights = AuthorWeights::default();
        }
        let c = self.complexity;
        if !weights_valid(&[c.line_delta, c.imports, c.definitions]) {
            warn!("Invalid complexity weights in config, falling back to defaults");
            self.complexity = ComplexityWeights::default();
        }
        let l = self.lifespan;
        if !weights_valid(&[l.span, l.frequency, l.contributors]) {
            warn!("Invalid lifespan weights in config, falling back to defaults");
            self.lifespan = LifespanWeights::default();
        }
        let q = self.quality;
        if !weights_valid(&[q.bug_fix, q.review, q.tests]) {
            warn!("Invalid quality weights in config, falling back to defaults");
            self.quality = QualityWeights::default();
        }
    }
}

/// Where commit events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// GrimoireLab-style git index in Elasticsearch (default)
    #[default]
    Elasticsearch,
    /// Local clones read with libgit2
    Git,
    /// A JSON array of commit events
    Json,
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elasticsearch" | "es" => Ok(SourceKind::Elasticsearch),
            "git" => Ok(SourceKind::Git),
            "json" => Ok(SourceKind::Json),
            _ => Err(anyhow::anyhow!(
                "Unknown source '{}'. Valid sources: elasticsearch, git, json",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    /// Directory holding local clones, for origins that are not paths
    #[serde(default)]
    pub clone_root: Option<PathBuf>,
    /// Commit events file for the json source
    #[serde(default)]
    pub events_file: Option<PathBuf>,
}

/// Elasticsearch connection and index names
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_commits_index")]
    pub commits_index: String,
    #[serde(default = "default_scores_index")]
    pub scores_index: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            commits_index: default_commits_index(),
            scores_index: default_scores_index(),
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            username: None,
            password: None,
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:9200".to_string()
}
fn default_commits_index() -> String {
    "git".to_string()
}
fn default_scores_index() -> String {
    "impact_scores".to_string()
}
fn default_page_size() -> usize {
    500
}
fn default_batch_size() -> usize {
    500
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    #[default]
    None,
    Http,
}

/// Fallback identity lookup
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub lookup: LookupKind,
    /// URL with an `{id}` placeholder, e.g. `https://api.github.com/users/{id}`
    #[serde(default)]
    pub url_template: Option<String>,
    /// Environment variable holding a bearer token for the lookup service
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            lookup: LookupKind::None,
            url_template: None,
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default = "default_projects_file")]
    pub file: PathBuf,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            file: default_projects_file(),
        }
    }
}

fn default_projects_file() -> PathBuf {
    PathBuf::from("projects.json")
}

/// Load the engine configuration.
///
/// An explicit path must load. Otherwise `impactlens.toml` then
/// `.impactlensrc.json` are tried in `dir`; a broken file is logged and
/// defaults are used.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<ImpactConfig> {
    let mut config = match explicit {
        Some(path) => load_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => discover(dir),
    };
    config.scoring.validate();
    if !config.pagerank.is_valid() {
        warn!(
            "Invalid pagerank parameters {:?}, falling back to defaults",
            config.pagerank
        );
        config.pagerank = PageRankConfig::default();
    }
    Ok(config)
}

fn discover(dir: &Path) -> ImpactConfig {
    for name in ["impactlens.toml", ".impactlensrc.json"] {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_file(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
            }
        }
    }

    debug!("No config file found, using defaults");
    ImpactConfig::default()
}

fn load_file(path: &Path) -> anyhow::Result<ImpactConfig> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext == "json")
        || path.file_name().is_some_and(|n| n == ".impactlensrc.json");
    let config = if is_json {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(config)
}
