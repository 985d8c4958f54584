use super::error::Error;
use entity::ideas::{ActiveModel, Column, Embedding, Entity, Model};
use entity::{users, Id};
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    FromQueryResult, QueryOrder, QuerySelect, TryIntoModel,
};

use log::*;

/// The slice of an idea the similarity engine compares against: everything but
/// the descriptions. The embedding stays raw JSON so one malformed row cannot
/// fail the whole scan.
#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct CorpusRow {
    pub id: Id,
    pub author_id: Id,
    pub title: String,
    pub embedding: Option<Json>,
}

impl CorpusRow {
    pub fn embedding(&self) -> Option<Embedding> {
        self.embedding.as_ref().map(Embedding::from_json_lossy)
    }
}

pub async fn create(
    db: &impl ConnectionTrait,
    idea_model: Model,
    author_id: Id,
    embedding: Embedding,
) -> Result<Model, Error> {
    debug!(
        "New Idea \"{}\" to be inserted for author {author_id}",
        idea_model.title
    );

    let now = chrono::Utc::now();

    let idea_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        author_id: Set(author_id),
        title: Set(idea_model.title),
        short_description: Set(idea_model.short_description),
        full_description: Set(idea_model.full_description),
        is_paid: Set(idea_model.is_paid),
        price: Set(idea_model.price),
        document_ref: Set(idea_model.document_ref),
        embedding: Set(Some(embedding)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(idea_active_model.insert(db).await?.try_into_model()?)
}

/// Replaces the editable fields and the embedding of an existing idea. The
/// author and creation time never change.
pub async fn update(
    db: &impl ConnectionTrait,
    id: Id,
    model: Model,
    embedding: Embedding,
) -> Result<Model, Error> {
    let idea = find_by_id(db, id).await?;
    debug!("Existing Idea model to be Updated: {}", idea.id);

    let active_model: ActiveModel = ActiveModel {
        id: Unchanged(idea.id),
        author_id: Unchanged(idea.author_id),
        title: Set(model.title),
        short_description: Set(model.short_description),
        full_description: Set(model.full_description),
        is_paid: Set(model.is_paid),
        price: Set(model.price),
        document_ref: Set(model.document_ref),
        embedding: Set(Some(embedding)),
        created_at: Unchanged(idea.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| {
        debug!("Idea with id {id} not found");
        Error::not_found()
    })
}

pub async fn find_by_ids(db: &impl ConnectionTrait, ids: Vec<Id>) -> Result<Vec<Model>, Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    Ok(Entity::find().filter(Column::Id.is_in(ids)).all(db).await?)
}

/// Every idea with its author, newest first.
pub async fn find_all_with_authors(
    db: &impl ConnectionTrait,
) -> Result<Vec<(Model, Option<users::Model>)>, Error> {
    Ok(Entity::find()
        .find_also_related(users::Entity)
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// The comparison corpus: every idea carrying an embedding, oldest first, minus
/// `exclude_id` when one is given.
pub async fn find_corpus(
    db: &impl ConnectionTrait,
    exclude_id: Option<Id>,
) -> Result<Vec<CorpusRow>, Error> {
    let mut query = Entity::find()
        .select_only()
        .columns([Column::Id, Column::AuthorId, Column::Title, Column::Embedding])
        .filter(Column::Embedding.is_not_null());

    if let Some(exclude_id) = exclude_id {
        query = query.filter(Column::Id.ne(exclude_id));
    }

    Ok(query
        .order_by_asc(Column::CreatedAt)
        .into_model::<CorpusRow>()
        .all(db)
        .await?)
}

pub async fn delete_by_id(db: &impl ConnectionTrait, id: Id) -> Result<(), Error> {
    let result = Entity::delete_by_id(id).exec(db).await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found());
    }
    Ok(())
}
