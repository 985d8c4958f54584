//! Moderator-only views and actions over ideas and reported alerts.
use crate::error::Error;
use crate::idea::delete_with_alerts;
use crate::similarity_alert::{with_ideas, AlertWithIdeas};
use crate::{ideas, users, Id};
use entity_api::error::EntityApiErrorKind;
use entity_api::{idea, similarity_alert, user};
use log::*;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;

/// An idea as listed for audit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdeaWithAuthor {
    #[serde(flatten)]
    pub idea: ideas::Model,
    pub author_label: String,
    pub author_email: String,
}

/// Loads the requester and checks they moderate the platform. Unknown users
/// are denied the same way as ordinary ones.
pub async fn require_moderator(
    db: &impl ConnectionTrait,
    requester_id: Id,
) -> Result<users::Model, Error> {
    let requester = match user::find_by_id(db, requester_id).await {
        Ok(requester) => requester,
        Err(err) if err.error_kind == EntityApiErrorKind::RecordNotFound => {
            warn!("Moderation requested by unknown user {requester_id}");
            return Err(Error::permission_denied());
        }
        Err(err) => return Err(err.into()),
    };

    if !requester.is_moderator() {
        warn!("User {requester_id} is not a moderator");
        return Err(Error::permission_denied());
    }

    Ok(requester)
}

/// Every idea with its author, newest first.
pub async fn list_all_ideas(
    db: &DatabaseConnection,
    requester_id: Id,
) -> Result<Vec<IdeaWithAuthor>, Error> {
    require_moderator(db, requester_id).await?;

    let ideas = idea::find_all_with_authors(db).await?;

    Ok(ideas
        .into_iter()
        .map(|(idea, author)| IdeaWithAuthor {
            author_label: author
                .as_ref()
                .map(users::Model::author_label)
                .unwrap_or_default(),
            author_email: author.map(|a| a.email).unwrap_or_default(),
            idea,
        })
        .collect())
}

/// Alerts reported by their owners and not yet handled, newest first.
pub async fn list_reported(
    db: &DatabaseConnection,
    requester_id: Id,
) -> Result<Vec<AlertWithIdeas>, Error> {
    require_moderator(db, requester_id).await?;

    let alerts = similarity_alert::find_open_reports(db).await?;
    with_ideas(db, alerts).await
}

/// Clears the report queue of `idea_id` without deleting anything.
///
/// Returns how many alerts were dismissed.
pub async fn keep(db: &DatabaseConnection, requester_id: Id, idea_id: Id) -> Result<u64, Error> {
    let txn = db.begin().await?;

    require_moderator(&txn, requester_id).await?;
    idea::find_by_id(&txn, idea_id).await?;

    let dismissed = similarity_alert::dismiss_reports_for_similar_idea(&txn, idea_id).await?;

    txn.commit().await?;
    info!("Moderator {requester_id} kept idea {idea_id}, dismissing {dismissed} reports");

    Ok(dismissed)
}

/// Removes an idea and every alert that mentions it, on either side.
pub async fn delete(db: &DatabaseConnection, requester_id: Id, idea_id: Id) -> Result<(), Error> {
    let txn = db.begin().await?;

    require_moderator(&txn, requester_id).await?;
    delete_with_alerts(&txn, idea_id).await?;

    txn.commit().await?;
    info!("Moderator {requester_id} deleted idea {idea_id}");

    Ok(())
}
