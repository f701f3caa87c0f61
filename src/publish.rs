//! Publishing scores back to the store
//!
//! One repository is one logical unit: its documents go out in batches of at
//! most `batch_size`, a failed batch is recorded and the next batch is still
//! sent, and nothing already written is rolled back.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, error, warn};

use crate::models::{document_id, ImpactScore, ScoreDocument};
use crate::scoring::RepositoryScores;
use crate::store::{BulkFailure, ScoreSink};

/// What happened to one repository's documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    pub repository: String,
    pub attempted: usize,
    pub written: Vec<String>,
    pub failed: Vec<BulkFailure>,
    pub batches: usize,
    /// Identifiers whose document id got a suffix to avoid a name collision
    pub collisions: Vec<String>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build the score documents of one repository.
///
/// Ids are `{repository}_{canonical name}`. When two identifiers resolve to
/// the same name, the later identifier (in identifier order) gets
/// `_{identifier}` appended so neither overwrites the other, plus `_{n}` if
/// that is taken too. Returns the
/// documents and the identifiers that collided.
pub fn build_documents(
    scores: &RepositoryScores,
    computed_at: DateTime<Utc>,
) -> (Vec<ScoreDocument>, Vec<String>) {
    let mut authors: Vec<_> = scores.authors.iter().collect();
    authors.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    let mut used: HashSet<String> = HashSet::new();
    let mut collisions = Vec::new();
    let mut documents = Vec::with_capacity(authors.len());

    for author in authors {
        let mut id = document_id(&scores.repository, &author.canonical_name);
        if used.contains(&id) {
            let suffixed = format!("{}_{}", author.canonical_name, author.identifier);
            id = document_id(&scores.repository, &suffixed);
            // The suffixed id may itself be another author's name
            let mut n = 2;
            while used.contains(&id) {
                id = document_id(&scores.repository, &format!("{}_{}", suffixed, n));
                n += 1;
            }
            warn!(
                "{} and another author both resolve to \"{}\" in {}; publishing as {}",
                author.identifier, author.canonical_name, scores.repository, id
            );
            collisions.push(author.identifier.clone());
        }
        used.insert(id.clone());

        documents.push(ScoreDocument {
            id,
            body: ImpactScore {
                repository: scores.repository.clone(),
                author_identifier: author.identifier.clone(),
                author_name: author.canonical_name.clone(),
                score: author.score,
                computed_at,
            },
        });
    }

    (documents, collisions)
}

/// Upserts repository scores through a [`ScoreSink`]
pub struct ResultPublisher<'a> {
    sink: &'a dyn ScoreSink,
    batch_size: usize,
}

impl<'a> ResultPublisher<'a> {
    pub fn new(sink: &'a dyn ScoreSink, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    pub fn publish(&self, scores: &RepositoryScores, computed_at: DateTime<Utc>) -> PublishReport {
        let (documents, collisions) = build_documents(scores, computed_at);
        let mut report = PublishReport {
            repository: scores.repository.clone(),
            attempted: documents.len(),
            collisions,
            ..Default::default()
        };

        for batch in documents.chunks(self.batch_size) {
            report.batches += 1;
            match self.sink.bulk_upsert(batch) {
                Ok(outcome) => {
                    for failure in &outcome.failed {
                        warn!(
                            "Failed to publish {} for {}: {}",
                            failure.id, scores.repository, failure.reason
                        );
                    }
                    report.written.extend(outcome.written);
                    report.failed.extend(outcome.failed);
                }
                Err(e) => {
                    error!(
                        "Bulk upsert of {} documents for {} failed: {}",
                        batch.len(),
                        scores.repository,
                        e
                    );
                    report.failed.extend(batch.iter().map(|doc| BulkFailure {
                        id: doc.id.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }

        debug!(
            "Published {}/{} scores for {} in {} batch(es)",
            report.written.len(),
            report.attempted,
            scores.repository,
            report.batches
        );
        report
    }
}
