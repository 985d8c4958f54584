//! `SeaORM` Entity for the ideas table.
//! An idea is a short pitch published by its author. Every idea that has been
//! saved at least once carries the embedding used for duplicate detection.

use crate::Id;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Fixed-dimension vector representing the semantics of an idea's text.
/// Persisted as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Reads a stored JSON value without failing. Anything other than an array
    /// of finite numbers yields an empty embedding, which never scores.
    pub fn from_json_lossy(value: &serde_json::Value) -> Self {
        let Some(items) = value.as_array() else {
            return Self::default();
        };

        items
            .iter()
            .map(|item| item.as_f64().map(|n| n as f32).filter(|n| n.is_finite()))
            .collect::<Option<Vec<f32>>>()
            .map(Self)
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ideas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip_deserializing)]
    pub id: Id,
    #[serde(skip_deserializing)]
    pub author_id: Id,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub short_description: String,
    #[sea_orm(column_type = "Text")]
    pub full_description: String,
    #[serde(default)]
    pub is_paid: bool,
    /// Price in minor currency units (cents).
    #[serde(default)]
    pub price: i64,
    pub document_ref: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,
    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuthorId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
