//! `SeaORM` Entity for the similarity_alerts table.
//! Links an original idea (whose author is notified) to a newer idea by a
//! different author that was force-published despite scoring in the warning band.
//! The pair (idea_id, similar_idea_id) is unique.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "similarity_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(skip_deserializing)]
    pub id: Id,
    /// The original idea; its author owns this alert.
    pub idea_id: Id,
    /// The newer idea that triggered the alert.
    pub similar_idea_id: Id,
    pub similarity_score: f64,
    #[serde(default)]
    pub is_reported: bool,
    #[serde(default)]
    pub is_dismissed: bool,
    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ideas::Entity",
        from = "Column::IdeaId",
        to = "super::ideas::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Idea,
    #[sea_orm(
        belongs_to = "super::ideas::Entity",
        from = "Column::SimilarIdeaId",
        to = "super::ideas::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SimilarIdea,
}

// Only the original idea is registered as "the" related idea; joins against the
// similar idea go through `Relation::SimilarIdea` explicitly.
impl Related<super::ideas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Idea.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
