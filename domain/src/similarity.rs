//! Cosine scoring of embeddings and ranking of the comparison corpus.
//!
//! The corpus is scanned linearly. `CorpusAccessor` is the seam where an
//! approximate nearest-neighbor index can replace the scan later.
use crate::error::Error;
use async_trait::async_trait;
use entity::ideas::Embedding;
use entity::Id;
use entity_api::{idea, user};
use log::*;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Number of matches returned with a rejection and considered for alerts.
pub const MAX_MATCHES: usize = 5;

/// One comparable idea: everything the ranker needs, nothing more.
#[derive(Clone, Debug, PartialEq)]
pub struct CorpusEntry {
    pub idea_id: Id,
    pub author_id: Id,
    pub author_label: String,
    pub title: String,
    pub embedding: Embedding,
}

/// An existing idea that resembles a draft.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarMatch {
    pub idea_id: Id,
    pub title: String,
    pub author_id: Id,
    pub author_label: String,
    /// Unrounded cosine similarity in [0, 1]. Use `rounded_score` for display.
    pub score: f64,
}

impl SimilarMatch {
    pub fn rounded_score(&self) -> f64 {
        round_score(self.score)
    }
}

#[async_trait]
pub trait CorpusAccessor: Send + Sync {
    /// Every idea that has an embedding, oldest first, without `exclude_id`.
    async fn snapshot(&self, exclude_id: Option<Id>) -> Result<Vec<CorpusEntry>, Error>;
}

/// Reads the corpus straight from the `ideas` table.
pub struct DatabaseCorpus {
    db: Arc<DatabaseConnection>,
}

impl DatabaseCorpus {
    pub fn new(db: &Arc<DatabaseConnection>) -> Self {
        Self {
            db: Arc::clone(db),
        }
    }
}

#[async_trait]
impl CorpusAccessor for DatabaseCorpus {
    async fn snapshot(&self, exclude_id: Option<Id>) -> Result<Vec<CorpusEntry>, Error> {
        let rows = idea::find_corpus(self.db.as_ref(), exclude_id).await?;

        let author_ids: Vec<Id> = rows
            .iter()
            .map(|row| row.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors = user::find_by_ids(self.db.as_ref(), author_ids).await?;

        let entries: Vec<CorpusEntry> = rows
            .into_iter()
            .filter_map(|row| {
                let embedding = row.embedding()?;
                if embedding.as_slice().is_empty() {
                    warn!("Idea {} has a malformed stored embedding", row.id);
                }
                let author_label = authors
                    .get(&row.author_id)
                    .map(|author| author.author_label())
                    .unwrap_or_default();

                Some(CorpusEntry {
                    idea_id: row.id,
                    author_id: row.author_id,
                    author_label,
                    title: row.title,
                    embedding,
                })
            })
            .collect();

        debug!("Loaded corpus snapshot with {} entries", entries.len());
        Ok(entries)
    }
}

/// Cosine similarity of two embeddings, clamped to [0, 1].
///
/// Returns 0.0 instead of failing when either vector is empty, the lengths
/// differ, either vector has zero norm, or a component is not finite. A single
/// corrupt stored vector then only drops out of the comparison.
pub fn score(v1: &[f32], v2: &[f32]) -> f64 {
    if v1.is_empty() || v2.is_empty() || v1.len() != v2.len() {
        return 0.0;
    }

    let (mut dot, mut norm1, mut norm2) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (&a, &b) in v1.iter().zip(v2) {
        if !a.is_finite() || !b.is_finite() {
            return 0.0;
        }
        let (a, b) = (f64::from(a), f64::from(b));
        dot += a * b;
        norm1 += a * a;
        norm2 += b * b;
    }

    if norm1 == 0.0 || norm2 == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm1.sqrt() * norm2.sqrt());
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(0.0, 1.0)
}

/// Rounds a score to three decimals for display and storage on alerts.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Scores `embedding` against the corpus and keeps the best `MAX_MATCHES`,
/// highest score first. Equal scores keep corpus order, so the older idea wins.
pub fn rank(embedding: &[f32], corpus: &[CorpusEntry], exclude_id: Option<Id>) -> Vec<SimilarMatch> {
    let mut matches: Vec<SimilarMatch> = corpus
        .iter()
        .filter(|entry| Some(entry.idea_id) != exclude_id)
        .map(|entry| SimilarMatch {
            idea_id: entry.idea_id,
            title: entry.title.clone(),
            author_id: entry.author_id,
            author_label: entry.author_label.clone(),
            score: score(embedding, entry.embedding.as_slice()),
        })
        .collect();

    // `sort_by` is stable
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(MAX_MATCHES);
    matches
}

/// Score of the first match, or 0.0 when nothing was ranked.
pub fn best_score(matches: &[SimilarMatch]) -> f64 {
    matches.first().map_or(0.0, |best| best.score)
}
