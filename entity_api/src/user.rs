use super::error::Error;
use chrono::Utc;
use std::collections::HashMap;

use entity::users::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};

pub use entity::users::Role;

pub async fn create(db: &impl ConnectionTrait, user_model: Model) -> Result<Model, Error> {
    debug!("New User Model to be inserted: {}", user_model.username);

    let now = Utc::now();
    let user_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        email: Set(user_model.email),
        username: Set(user_model.username),
        first_name: Set(user_model.first_name),
        last_name: Set(user_model.last_name),
        role: Set(user_model.role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(user_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(Error::not_found)
}

/// Loads the given users keyed by id. Unknown ids are simply absent from the map.
pub async fn find_by_ids(
    db: &impl ConnectionTrait,
    ids: Vec<Id>,
) -> Result<HashMap<Id, Model>, Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = Entity::find().filter(Column::Id.is_in(ids)).all(db).await?;

    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}
