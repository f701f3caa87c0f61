//! Elasticsearch adapter over sync HTTP (ureq)
//!
//! Reads commits from a GrimoireLab-style enriched git index and upserts
//! impact scores through the `_bulk` API.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{BulkFailure, BulkOutcome, EventSource, ScoreSink, StoreError};
use crate::config::StoreConfig;
use crate::models::{CommitEvent, FileChange, ScoreDocument};

/// Client for one Elasticsearch cluster
pub struct ElasticStore {
    base_url: String,
    commits_index: String,
    scores_index: String,
    page_size: usize,
    authorization: Option<String>,
    agent: ureq::Agent,
}

fn make_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
        .build()
        .new_agent()
}

impl ElasticStore {
    pub fn new(config: &StoreConfig) -> Self {
        let authorization = config.username.as_ref().map(|user| {
            let password = config.password.as_deref().unwrap_or("");
            let token = general_purpose::STANDARD.encode(format!("{user}:{password}"));
            format!("Basic {token}")
        });
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            commits_index: config.commits_index.clone(),
            scores_index: config.scores_index.clone(),
            page_size: config.page_size.max(1),
            authorization,
            agent: make_agent(config.timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.authorization {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }

    /// Check the cluster answers; returns its version number
    pub fn ping(&self) -> Result<String, StoreError> {
        let response = self
            .authorize(self.agent.get(&self.base_url))
            .call()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(StoreError::Status { status, message });
        }

        let info: Value = response
            .into_body()
            .read_json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(info["version"]["number"]
            .as_str()
            .unwrap_or("unknown")
            .to_string())
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<Value, StoreError> {
        let response = self
            .authorize(self.agent.post(url))
            .header("Content-Type", "application/json")
            .send_json(body)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(StoreError::Status { status, message });
        }

        response
            .into_body()
            .read_json()
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl EventSource for ElasticStore {
    fn fetch_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitEvent>, StoreError> {
        let url = format!("{}/{}/_search", self.base_url, self.commits_index);
        let (events, pages) = collect_pages(repository, self.page_size, |search_after| {
            let body = search_body(repository, since, self.page_size, search_after);
            self.post_json(&url, &body)
        })?;

        debug!(
            "Fetched {} commits of {} in {} page(s)",
            events.len(),
            repository,
            pages
        );
        Ok(events)
    }
}

/// Walk `search_after` pages of a commit search.
///
/// Stops on a page shorter than `page_size` or when the last hit carries no
/// `sort` values. Hits that do not decode are skipped, not fatal. Returns the
/// events and the number of pages fetched.
fn collect_pages(
    repository: &str,
    page_size: usize,
    mut fetch: impl FnMut(Option<&Value>) -> Result<Value, StoreError>,
) -> Result<(Vec<CommitEvent>, usize), StoreError> {
    let mut events = Vec::new();
    let mut search_after: Option<Value> = None;
    let mut pages = 0usize;

    loop {
        let mut page = fetch(search_after.as_ref())?;
        pages += 1;
        let hits = match page.pointer_mut("/hits/hits").map(Value::take) {
            Some(Value::Array(hits)) => hits,
            _ => {
                return Err(StoreError::Decode(
                    "search response has no hits.hits array".to_string(),
                ))
            }
        };

        let hit_count = hits.len();
        let mut last_sort = None;
        for mut hit in hits {
            last_sort = hit.get("sort").filter(|s| !s.is_null()).cloned();
            match serde_json::from_value::<GitDocument>(hit["_source"].take()) {
                Ok(doc) => match into_commit_event(doc) {
                    Some(event) => events.push(event),
                    None => debug!("Skipping commit without author or date in {}", repository),
                },
                Err(e) => warn!("Skipping malformed commit document in {}: {}", repository, e),
            }
        }

        if hit_count < page_size.max(1) {
            break;
        }
        match last_sort {
            Some(sort) => search_after = Some(sort),
            None => break,
        }
    }

    Ok((events, pages))
}

impl ScoreSink for ElasticStore {
    fn bulk_upsert(&self, documents: &[ScoreDocument]) -> Result<BulkOutcome, StoreError> {
        if documents.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let body = bulk_body(&self.scores_index, documents)?;
        let response = self
            .authorize(self.agent.post(&format!("{}/_bulk", self.base_url)))
            .header("Content-Type", "application/x-ndjson")
            .send(body)
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(StoreError::Status { status, message });
        }

        let reply: Value = response
            .into_body()
            .read_json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let outcome = parse_bulk_response(&reply, documents);
        if !outcome.failed.is_empty() {
            warn!(
                "Bulk upsert into {} rejected {} of {} documents",
                self.scores_index,
                outcome.failed.len(),
                documents.len()
            );
        }
        Ok(outcome)
    }
}

// Enriched git index documents
#[derive(Deserialize)]
struct GitDocument {
    origin: String,
    #[serde(default)]
    hash: Option<String>,
    #[serde(default)]
    author_uuid: Option<String>,
    #[serde(default)]
    author_name: Option<String>,
    grimoire_creation_date: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    files: Vec<GitFile>,
}

#[derive(Deserialize)]
struct GitFile {
    file: String,
    #[serde(default)]
    added: Value,
    #[serde(default)]
    removed: Value,
}

fn search_body(
    repository: &str,
    since: DateTime<Utc>,
    page_size: usize,
    search_after: Option<&Value>,
) -> Value {
    let mut filter = vec![json!({ "term": { "origin": repository } })];
    // An unbounded window has no range clause
    if since > DateTime::<Utc>::MIN_UTC {
        filter.push(json!({ "range": { "grimoire_creation_date": { "gte": since.to_rfc3339() } } }));
    }
    let mut body = json!({
        "size": page_size,
        "query": {
            "bool": {
                "filter": filter
            }
        },
        "sort": [
            { "grimoire_creation_date": "asc" },
            { "hash": "asc" }
        ]
    });
    if let Some(after) = search_after {
        body["search_after"] = after.clone();
    }
    body
}

/// Line counts arrive as numbers, numeric strings or `"-"` for binary files
fn line_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn into_commit_event(doc: GitDocument) -> Option<CommitEvent> {
    let name = doc.author_name.unwrap_or_default().trim().to_string();
    let identifier = doc
        .author_uuid
        .map(|uuid| uuid.trim().to_string())
        .filter(|uuid| !uuid.is_empty())
        .unwrap_or_else(|| name.clone());
    if identifier.is_empty() {
        return None;
    }
    let timestamp = parse_date(&doc.grimoire_creation_date)?;

    Some(CommitEvent {
        repository: doc.origin,
        author_identifier: identifier,
        author_display_name: name,
        commit_hash: doc.hash.unwrap_or_default(),
        timestamp,
        files: doc
            .files
            .into_iter()
            .map(|f| FileChange::new(f.file, line_count(&f.added), line_count(&f.removed)))
            .collect(),
        message: doc.message.unwrap_or_default(),
    })
}

fn bulk_body(index: &str, documents: &[ScoreDocument]) -> Result<String, StoreError> {
    let mut body = String::new();
    for doc in documents {
        let action = json!({ "update": { "_index": index, "_id": doc.id } });
        let source = json!({ "doc": doc.body, "doc_as_upsert": true });
        for line in [action, source] {
            body.push_str(
                &serde_json::to_string(&line).map_err(|e| StoreError::Decode(e.to_string()))?,
            );
            body.push('\n');
        }
    }
    Ok(body)
}

fn parse_bulk_response(reply: &Value, documents: &[ScoreDocument]) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();
    let items = reply["items"].as_array().cloned().unwrap_or_default();

    for (i, doc) in documents.iter().enumerate() {
        let Some(item) = items.get(i) else {
            outcome.failed.push(BulkFailure {
                id: doc.id.clone(),
                reason: "missing from bulk response".to_string(),
            });
            continue;
        };
        let result = item
            .as_object()
            .and_then(|obj| obj.values().next())
            .cloned()
            .unwrap_or(Value::Null);
        let id = result["_id"].as_str().unwrap_or(&doc.id).to_string();
        let status = result["status"].as_u64().unwrap_or(0);

        if (200..300).contains(&status) {
            outcome.written.push(id);
        } else {
            let reason = result["error"]["reason"]
                .as_str()
                .or_else(|| result["error"]["type"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("status {status}"));
            outcome.failed.push(BulkFailure { id, reason });
        }
    }
    outcome
}
