//! Shared fixtures for the domain integration tests: an in-memory SQLite
//! database with the platform schema and a deterministic embedding provider.
#![allow(dead_code)]

use async_trait::async_trait;
use domain::decision::Thresholds;
use domain::error::{DomainErrorKind, Error, ExternalErrorKind};
use domain::gateway::embedding::EmbeddingProvider;
use domain::idea::PublishPipeline;
use domain::{ideas, similarity_alerts, users, Id, Role};
use sea_orm::sea_query::Index;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, Schema,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMENSION: usize = 3;

/// A unit vector whose cosine against `[1, 0, 0]` is `score`.
pub fn vector_scoring(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).sqrt(), 0.0]
}

pub async fn setup_db() -> Arc<DatabaseConnection> {
    // One connection, otherwise every connection would open its own empty database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("in-memory sqlite should open");

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();

    db.execute(backend.build(&schema.create_table_from_entity(users::Entity)))
        .await
        .expect("create users");
    db.execute(backend.build(&schema.create_table_from_entity(ideas::Entity)))
        .await
        .expect("create ideas");
    db.execute(backend.build(&schema.create_table_from_entity(similarity_alerts::Entity)))
        .await
        .expect("create similarity_alerts");
    let alert_pair_index = Index::create()
        .name("similarity_alerts_idea_similar_idea_unique")
        .table(similarity_alerts::Entity)
        .col(similarity_alerts::Column::IdeaId)
        .col(similarity_alerts::Column::SimilarIdeaId)
        .unique()
        .to_owned();
    db.execute(backend.build(&alert_pair_index))
        .await
        .expect("create unique alert pair index");

    Arc::new(db)
}

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    first_name: Option<&str>,
    role: Role,
) -> users::Model {
    let now = chrono::Utc::now();
    entity_api::user::create(
        db,
        users::Model {
            id: Id::new_v4(),
            email: format!("{username}@ideaplatform.dev"),
            username: username.to_owned(),
            first_name: first_name.map(str::to_owned),
            last_name: None,
            role,
            created_at: now.into(),
            updated_at: now.into(),
        },
    )
    .await
    .expect("create user")
}

/// Stores an idea with a fixed embedding, bypassing the duplicate check.
pub async fn create_idea(
    db: &DatabaseConnection,
    author: &users::Model,
    title: &str,
    embedding: Vec<f32>,
) -> ideas::Model {
    let now = chrono::Utc::now();
    let idea = entity_api::idea::create(
        db,
        ideas::Model {
            id: Id::new_v4(),
            author_id: author.id,
            title: title.to_owned(),
            short_description: format!("{title} in one line"),
            full_description: format!("{title} explained at length"),
            is_paid: false,
            price: 0,
            document_ref: None,
            embedding: None,
            created_at: now.into(),
            updated_at: now.into(),
        },
        author.id,
        ideas::Embedding(embedding),
    )
    .await
    .expect("create idea");

    // Keep created_at strictly increasing between fixtures
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    idea
}

pub fn draft(title: &str) -> domain::idea::IdeaDraft {
    domain::idea::IdeaDraft {
        title: title.to_owned(),
        short_description: format!("{title} in one line"),
        full_description: format!("{title} explained at length"),
        ..Default::default()
    }
}

pub async fn idea_count(db: &DatabaseConnection) -> u64 {
    ideas::Entity::find().count(db).await.expect("count ideas")
}

pub async fn alerts(db: &DatabaseConnection) -> Vec<similarity_alerts::Model> {
    similarity_alerts::Entity::find()
        .all(db)
        .await
        .expect("load alerts")
}

/// Embeds text by looking its first line (the title) up in a table.
#[derive(Default)]
pub struct FakeEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    failing: bool,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with(self, title: &str, vector: Vec<f32>) -> Self {
        self.insert(title, vector);
        self
    }

    pub fn insert(&self, title: &str, vector: Vec<f32>) {
        self.vectors
            .lock()
            .expect("vectors lock")
            .insert(title.to_owned(), vector);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let unavailable = || Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::ProviderUnavailable),
        };
        if self.failing {
            return Err(unavailable());
        }

        let title = text.lines().next().unwrap_or_default();
        self.vectors
            .lock()
            .expect("vectors lock")
            .get(title)
            .cloned()
            .ok_or_else(unavailable)
    }

    fn dimension(&self) -> Option<usize> {
        Some(DIMENSION)
    }
}

pub fn pipeline(db: &Arc<DatabaseConnection>, embedder: &Arc<FakeEmbedder>) -> PublishPipeline {
    let embedder: Arc<dyn EmbeddingProvider> = embedder.clone();
    PublishPipeline::new(db, embedder, Thresholds::default())
}
