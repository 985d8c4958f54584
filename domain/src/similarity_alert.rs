//! Alerts left for the author of an earlier idea when a similar idea by
//! someone else was force-published.
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use crate::similarity_alerts::Model;
use crate::{ideas, users, Id};
use entity_api::{idea, similarity_alert, user};
use log::*;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Short view of an idea shown next to an alert.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdeaBrief {
    pub id: Id,
    pub title: String,
    pub short_description: String,
    pub author_id: Id,
    pub author_label: String,
    pub author_email: String,
    pub created_at: sea_orm::prelude::DateTimeWithTimeZone,
}

impl IdeaBrief {
    fn new(idea: &ideas::Model, author: Option<&users::Model>) -> Self {
        Self {
            id: idea.id,
            title: idea.title.clone(),
            short_description: idea.short_description.clone(),
            author_id: idea.author_id,
            author_label: author.map(users::Model::author_label).unwrap_or_default(),
            author_email: author.map(|a| a.email.clone()).unwrap_or_default(),
            created_at: idea.created_at,
        }
    }
}

/// An alert together with the original idea and the newer idea resembling it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlertWithIdeas {
    #[serde(flatten)]
    pub alert: Model,
    pub idea: IdeaBrief,
    pub similar_idea: IdeaBrief,
}

/// Flags an alert for moderator review. Only the owner of the original idea may
/// report it; reporting twice is harmless.
pub async fn report(
    db: &DatabaseConnection,
    alert_id: Id,
    requester_id: Id,
) -> Result<Model, Error> {
    let txn = db.begin().await?;

    let alert = find_owned(&txn, alert_id, requester_id).await?;
    let alert = if alert.is_reported {
        alert
    } else {
        similarity_alert::mark_reported(&txn, alert).await?
    };

    txn.commit().await?;
    info!("Similarity alert {alert_id} reported by {requester_id}");

    Ok(alert)
}

/// Hides an alert from its owner's active list. Moderators still see it.
pub async fn dismiss(
    db: &DatabaseConnection,
    alert_id: Id,
    requester_id: Id,
) -> Result<Model, Error> {
    let txn = db.begin().await?;

    let alert = find_owned(&txn, alert_id, requester_id).await?;
    let alert = if alert.is_dismissed {
        alert
    } else {
        similarity_alert::mark_dismissed(&txn, alert).await?
    };

    txn.commit().await?;
    info!("Similarity alert {alert_id} dismissed by {requester_id}");

    Ok(alert)
}

/// The owner's alerts that have not been dismissed, newest first.
pub async fn find_active_for_owner(
    db: &DatabaseConnection,
    owner_id: Id,
) -> Result<Vec<AlertWithIdeas>, Error> {
    let alerts = similarity_alert::find_active_by_owner(db, owner_id).await?;
    with_ideas(db, alerts).await
}

async fn find_owned(
    db: &impl ConnectionTrait,
    alert_id: Id,
    requester_id: Id,
) -> Result<Model, Error> {
    let (alert, idea) = similarity_alert::find_by_id_with_idea(db, alert_id).await?;

    if idea.author_id != requester_id {
        warn!("User {requester_id} does not own similarity alert {alert_id}");
        return Err(Error::permission_denied());
    }

    Ok(alert)
}

/// Attaches both ideas and their authors to each alert, keeping the order of
/// `alerts`. Ideas and authors are loaded in one query each.
pub(crate) async fn with_ideas(
    db: &impl ConnectionTrait,
    alerts: Vec<Model>,
) -> Result<Vec<AlertWithIdeas>, Error> {
    let idea_ids: HashSet<Id> = alerts
        .iter()
        .flat_map(|alert| [alert.idea_id, alert.similar_idea_id])
        .collect();
    let ideas: HashMap<Id, ideas::Model> = idea::find_by_ids(db, idea_ids.into_iter().collect())
        .await?
        .into_iter()
        .map(|idea| (idea.id, idea))
        .collect();

    let author_ids: HashSet<Id> = ideas.values().map(|idea| idea.author_id).collect();
    let authors = user::find_by_ids(db, author_ids.into_iter().collect()).await?;

    let brief = |idea_id: &Id| {
        ideas
            .get(idea_id)
            .map(|idea| IdeaBrief::new(idea, authors.get(&idea.author_id)))
    };

    alerts
        .into_iter()
        .map(|alert| match (brief(&alert.idea_id), brief(&alert.similar_idea_id)) {
            (Some(idea), Some(similar_idea)) => Ok(AlertWithIdeas {
                alert,
                idea,
                similar_idea,
            }),
            _ => {
                error!("Similarity alert {} references a missing idea", alert.id);
                Err(Error {
                    source: None,
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(format!(
                        "similarity alert {} references a missing idea",
                        alert.id
                    ))),
                })
            }
        })
        .collect()
}
