//! Publishing and editing ideas behind the duplicate check.
//!
//! The embedding call and the corpus scan both finish before any transaction
//! opens, so a slow provider never holds database locks. A rejected or failed
//! submission writes nothing.
use crate::decision::{decide, decide_on_edit, Decision, Thresholds};
use crate::error::Error;
use crate::gateway::embedding::EmbeddingProvider;
use crate::ideas::{Embedding, Model};
use crate::similarity::{best_score, rank, round_score, CorpusAccessor, DatabaseCorpus, SimilarMatch};
use crate::Id;
use entity_api::{idea, ideas, query, similarity_alert, IntoQueryFilterMap, QueryFilterMap};
use log::*;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use entity_api::idea::find_by_id;

const MAX_TITLE_CHARS: usize = 255;

/// The fields an author supplies for a new idea.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct IdeaDraft {
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    #[serde(default)]
    pub is_paid: bool,
    /// Price in minor currency units.
    #[serde(default)]
    pub price: i64,
    pub document_ref: Option<String>,
}

/// Partial update of an idea. `None` keeps the stored value;
/// `document_ref: Some(None)` clears the document reference.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct IdeaPatch {
    pub title: Option<String>,
    pub short_description: Option<String>,
    pub full_description: Option<String>,
    pub is_paid: Option<bool>,
    pub price: Option<i64>,
    pub document_ref: Option<Option<String>>,
}

/// Why a draft or edit was turned away, with the ideas it resembles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarityRejection {
    pub kind: Decision,
    /// Best score, rounded to three decimals.
    pub similarity: f64,
    pub matches: Vec<SimilarMatch>,
}

impl SimilarityRejection {
    fn new(kind: Decision, best_score: f64, matches: Vec<SimilarMatch>) -> Self {
        Self {
            kind,
            similarity: round_score(best_score),
            matches: matches
                .into_iter()
                .map(|m| SimilarMatch {
                    score: m.rounded_score(),
                    ..m
                })
                .collect(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum SubmitOutcome {
    Created(Model),
    Rejected(SimilarityRejection),
}

#[derive(Debug, PartialEq)]
pub enum EditOutcome {
    Updated(Model),
    Rejected(SimilarityRejection),
}

/// Filters for listing ideas.
#[derive(Debug, Default)]
pub struct IdeaQuery {
    pub author_id: Option<Id>,
}

impl IntoQueryFilterMap for IdeaQuery {
    fn into_query_filter_map(self) -> QueryFilterMap {
        let mut query_filter_map = QueryFilterMap::new();
        query_filter_map.insert(
            "author_id".to_string(),
            self.author_id.map(|id| Value::Uuid(Some(Box::new(id)))),
        );
        query_filter_map
    }
}

/// Lists ideas matching `params`, newest first.
pub async fn find_by(
    db: &DatabaseConnection,
    params: impl IntoQueryFilterMap,
) -> Result<Vec<Model>, Error> {
    let ideas = query::find_by::<ideas::Entity, ideas::Column>(
        db,
        params.into_query_filter_map(),
        ideas::Column::CreatedAt,
    )
    .await?;

    Ok(ideas)
}

/// Deletes an idea on behalf of its author, together with every alert that
/// mentions it.
pub async fn delete(db: &DatabaseConnection, idea_id: Id, requester_id: Id) -> Result<(), Error> {
    let txn = db.begin().await?;

    let existing = idea::find_by_id(&txn, idea_id).await?;
    if existing.author_id != requester_id {
        warn!("User {requester_id} may not delete idea {idea_id}");
        return Err(Error::permission_denied());
    }

    delete_with_alerts(&txn, idea_id).await?;

    txn.commit().await?;
    info!("Idea {idea_id} deleted by its author");

    Ok(())
}

pub(crate) async fn delete_with_alerts(db: &impl ConnectionTrait, idea_id: Id) -> Result<(), Error> {
    similarity_alert::delete_referencing_idea(db, idea_id).await?;
    idea::delete_by_id(db, idea_id).await?;
    Ok(())
}

/// Runs drafts and edits through embedding, ranking and the decision engine,
/// and persists whatever is allowed.
pub struct PublishPipeline {
    db: Arc<DatabaseConnection>,
    embedder: Arc<dyn EmbeddingProvider>,
    corpus: Arc<dyn CorpusAccessor>,
    thresholds: Thresholds,
}

impl PublishPipeline {
    /// Builds a pipeline that scans the `ideas` table for its corpus.
    pub fn new(
        db: &Arc<DatabaseConnection>,
        embedder: Arc<dyn EmbeddingProvider>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            db: Arc::clone(db),
            embedder,
            corpus: Arc::new(DatabaseCorpus::new(db)),
            thresholds,
        }
    }

    pub fn with_corpus(mut self, corpus: Arc<dyn CorpusAccessor>) -> Self {
        self.corpus = corpus;
        self
    }

    /// Checks a new draft against the corpus and publishes it when allowed.
    ///
    /// `force_publish` overrides a warning but never a block. A forced publish
    /// in the warning band leaves an alert for every author among the top
    /// matches other than the submitting one.
    pub async fn submit(
        &self,
        author_id: Id,
        draft: IdeaDraft,
        force_publish: bool,
    ) -> Result<SubmitOutcome, Error> {
        let candidate = validate(draft_into_model(draft))?;

        let embedding = self.embed(&candidate).await?;
        let corpus = self.corpus.snapshot(None).await?;
        let matches = rank(embedding.as_slice(), &corpus, None);
        let best = best_score(&matches);

        let decision = decide(best, force_publish, &self.thresholds);
        if decision != Decision::Allow {
            warn!(
                "Submission \"{}\" by {author_id} rejected with {decision:?} (best score {best:.3})",
                candidate.title
            );
            return Ok(SubmitOutcome::Rejected(SimilarityRejection::new(
                decision, best, matches,
            )));
        }

        let forced_through_warning = force_publish && self.thresholds.in_warning_band(best);

        let txn = self.db.begin().await?;

        let created = idea::create(&txn, candidate, author_id, embedding).await?;

        if forced_through_warning {
            for m in matches.iter().filter(|m| m.author_id != author_id) {
                similarity_alert::create_if_absent(&txn, m.idea_id, created.id, m.rounded_score())
                    .await?;
            }
        }

        txn.commit().await?;

        info!(
            "Idea {} published by {author_id} (best score {best:.3}, forced: {forced_through_warning})",
            created.id
        );

        Ok(SubmitOutcome::Created(created))
    }

    /// Applies `patch` to an idea owned by `requester_id`. Edits are only ever
    /// blocked, never warned, and raise no alerts.
    pub async fn edit(
        &self,
        idea_id: Id,
        requester_id: Id,
        patch: IdeaPatch,
    ) -> Result<EditOutcome, Error> {
        let existing = idea::find_by_id(self.db.as_ref(), idea_id).await?;
        if existing.author_id != requester_id {
            warn!("User {requester_id} may not edit idea {idea_id}");
            return Err(Error::permission_denied());
        }

        let candidate = validate(apply_patch(existing, patch))?;

        let embedding = self.embed(&candidate).await?;
        let corpus = self.corpus.snapshot(Some(idea_id)).await?;
        let matches = rank(embedding.as_slice(), &corpus, Some(idea_id));
        let best = best_score(&matches);

        let decision = decide_on_edit(best, &self.thresholds);
        if decision == Decision::Block {
            warn!("Edit of idea {idea_id} blocked (best score {best:.3})");
            return Ok(EditOutcome::Rejected(SimilarityRejection::new(
                decision, best, matches,
            )));
        }

        let updated = idea::update(self.db.as_ref(), idea_id, candidate, embedding).await?;
        info!("Idea {idea_id} updated (best score {best:.3})");

        Ok(EditOutcome::Updated(updated))
    }

    async fn embed(&self, candidate: &Model) -> Result<Embedding, Error> {
        let text = embedding_text(
            &candidate.title,
            &candidate.short_description,
            &candidate.full_description,
        );
        let values = self.embedder.embed(&text).await?;

        if values.is_empty() {
            warn!("Embedding provider returned an empty vector");
            return Err(Error::provider_unavailable(None));
        }
        if values.iter().any(|value| !value.is_finite()) {
            warn!("Embedding provider returned a non-finite component");
            return Err(Error::provider_unavailable(None));
        }
        if let Some(dimension) = self.embedder.dimension() {
            if values.len() != dimension {
                warn!(
                    "Embedding provider returned {} dimensions, expected {dimension}",
                    values.len()
                );
                return Err(Error::provider_unavailable(None));
            }
        }

        Ok(Embedding(values))
    }
}

/// The text an idea is embedded from.
pub fn embedding_text(title: &str, short_description: &str, full_description: &str) -> String {
    format!("{title}\n{short_description}\n{full_description}")
        .trim()
        .to_string()
}

fn draft_into_model(draft: IdeaDraft) -> Model {
    let now = chrono::Utc::now();
    Model {
        id: Id::nil(),
        author_id: Id::nil(),
        title: draft.title,
        short_description: draft.short_description,
        full_description: draft.full_description,
        is_paid: draft.is_paid,
        price: draft.price,
        document_ref: draft.document_ref,
        embedding: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn apply_patch(mut idea: Model, patch: IdeaPatch) -> Model {
    if let Some(title) = patch.title {
        idea.title = title;
    }
    if let Some(short_description) = patch.short_description {
        idea.short_description = short_description;
    }
    if let Some(full_description) = patch.full_description {
        idea.full_description = full_description;
    }
    if let Some(is_paid) = patch.is_paid {
        idea.is_paid = is_paid;
    }
    if let Some(price) = patch.price {
        idea.price = price;
    }
    if let Some(document_ref) = patch.document_ref {
        idea.document_ref = document_ref;
    }
    idea
}

/// Field checks that run before anything is embedded.
fn validate(mut idea: Model) -> Result<Model, Error> {
    if idea.title.trim().is_empty() {
        return Err(Error::validation("title must not be blank"));
    }
    if idea.title.chars().count() > MAX_TITLE_CHARS {
        return Err(Error::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    if idea.short_description.trim().is_empty() {
        return Err(Error::validation("short description must not be blank"));
    }
    if idea.full_description.trim().is_empty() {
        return Err(Error::validation("full description must not be blank"));
    }
    if idea.price < 0 {
        return Err(Error::validation("price must not be negative"));
    }
    if idea.is_paid && idea.price == 0 {
        return Err(Error::validation("a paid idea needs a price"));
    }

    idea.document_ref = idea
        .document_ref
        .filter(|document_ref| !document_ref.trim().is_empty());

    Ok(idea)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, InternalErrorKind};

    fn draft() -> IdeaDraft {
        IdeaDraft {
            title: "Solar dryer".to_owned(),
            short_description: "Dry copra with sunlight".to_owned(),
            full_description: "A passive solar dryer for coconut farmers".to_owned(),
            ..Default::default()
        }
    }

    fn validation_message(result: Result<Model, Error>) -> String {
        match result.unwrap_err().error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Validation(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn embedding_text_joins_fields_and_trims() {
        assert_eq!(
            embedding_text(" Solar dryer", "Dry copra", "Details \n"),
            "Solar dryer\nDry copra\nDetails"
        );
    }

    #[test]
    fn validate_accepts_a_free_idea() {
        let idea = validate(draft_into_model(draft())).unwrap();
        assert_eq!(idea.price, 0);
    }

    #[test]
    fn validate_rejects_blank_fields() {
        let mut blank_title = draft();
        blank_title.title = "   ".to_owned();
        assert_eq!(
            validation_message(validate(draft_into_model(blank_title))),
            "title must not be blank"
        );

        let mut blank_short = draft();
        blank_short.short_description = String::new();
        assert_eq!(
            validation_message(validate(draft_into_model(blank_short))),
            "short description must not be blank"
        );

        let mut blank_full = draft();
        blank_full.full_description = "\n".to_owned();
        assert_eq!(
            validation_message(validate(draft_into_model(blank_full))),
            "full description must not be blank"
        );
    }

    #[test]
    fn validate_limits_title_length_in_characters() {
        let mut long_title = draft();
        long_title.title = "é".repeat(MAX_TITLE_CHARS);
        assert!(validate(draft_into_model(long_title.clone())).is_ok());

        long_title.title.push('é');
        assert!(validate(draft_into_model(long_title)).is_err());
    }

    #[test]
    fn validate_checks_pricing() {
        let mut negative = draft();
        negative.price = -1;
        assert_eq!(
            validation_message(validate(draft_into_model(negative))),
            "price must not be negative"
        );

        let mut unpriced = draft();
        unpriced.is_paid = true;
        assert_eq!(
            validation_message(validate(draft_into_model(unpriced))),
            "a paid idea needs a price"
        );

        let mut priced = draft();
        priced.is_paid = true;
        priced.price = 1_500;
        assert!(validate(draft_into_model(priced)).is_ok());
    }

    #[test]
    fn validate_drops_blank_document_refs() {
        let mut with_blank_ref = draft();
        with_blank_ref.document_ref = Some("  ".to_owned());
        assert_eq!(
            validate(draft_into_model(with_blank_ref)).unwrap().document_ref,
            None
        );
    }

    #[test]
    fn apply_patch_only_touches_given_fields() {
        let mut original = draft_into_model(draft());
        original.document_ref = Some("docs/solar.pdf".to_owned());

        let patched = apply_patch(
            original.clone(),
            IdeaPatch {
                title: Some("Solar kiln".to_owned()),
                document_ref: Some(None),
                ..Default::default()
            },
        );

        assert_eq!(patched.title, "Solar kiln");
        assert_eq!(patched.short_description, original.short_description);
        assert_eq!(patched.document_ref, None);
    }

    #[test]
    fn rejection_rounds_scores_for_display() {
        let rejection = SimilarityRejection::new(
            Decision::Warn,
            0.71849,
            vec![SimilarMatch {
                idea_id: Id::new_v4(),
                title: "Solar dryer".to_owned(),
                author_id: Id::new_v4(),
                author_label: "Ada Lovelace".to_owned(),
                score: 0.71849,
            }],
        );

        assert_eq!(rejection.similarity, 0.718);
        assert_eq!(rejection.matches[0].score, 0.718);
    }

    #[test]
    fn idea_query_only_filters_on_given_author() {
        let author_id = Id::new_v4();
        let filters = IdeaQuery {
            author_id: Some(author_id),
        }
        .into_query_filter_map();
        assert!(filters.get("author_id").is_some());

        assert!(IdeaQuery::default()
            .into_query_filter_map()
            .get("author_id")
            .is_none());
    }
}
