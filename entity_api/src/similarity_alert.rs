use super::error::Error;
use entity::similarity_alerts::{ActiveModel, Column, Entity, Model, Relation};
use entity::{ideas, Id};
use sea_orm::{
    entity::prelude::*, sea_query::OnConflict, ActiveValue::Set, Condition, IntoActiveModel,
    JoinType, QueryOrder, QuerySelect, TryIntoModel,
};

use log::*;

/// Inserts an alert for the pair unless one already exists.
///
/// Returns `true` when a new row was written.
pub async fn create_if_absent(
    db: &impl ConnectionTrait,
    idea_id: Id,
    similar_idea_id: Id,
    similarity_score: f64,
) -> Result<bool, Error> {
    let active_model = ActiveModel {
        id: Set(Id::new_v4()),
        idea_id: Set(idea_id),
        similar_idea_id: Set(similar_idea_id),
        similarity_score: Set(similarity_score),
        is_reported: Set(false),
        is_dismissed: Set(false),
        created_at: Set(chrono::Utc::now().into()),
    };

    let rows_affected = Entity::insert(active_model)
        .on_conflict(
            OnConflict::columns([Column::IdeaId, Column::SimilarIdeaId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if rows_affected == 0 {
        debug!("Similarity alert for ({idea_id}, {similar_idea_id}) already exists");
    }

    Ok(rows_affected > 0)
}

/// Finds an alert together with the original idea it points at.
pub async fn find_by_id_with_idea(
    db: &impl ConnectionTrait,
    id: Id,
) -> Result<(Model, ideas::Model), Error> {
    if let Some((alert, Some(idea))) = Entity::find_by_id(id)
        .find_also_related(ideas::Entity)
        .one(db)
        .await?
    {
        return Ok((alert, idea));
    }
    Err(Error::not_found())
}

pub async fn mark_reported(db: &impl ConnectionTrait, alert: Model) -> Result<Model, Error> {
    debug!("Marking similarity alert {} as reported", alert.id);

    let mut active_model = alert.into_active_model();
    active_model.is_reported = Set(true);

    Ok(active_model.update(db).await?.try_into_model()?)
}

pub async fn mark_dismissed(db: &impl ConnectionTrait, alert: Model) -> Result<Model, Error> {
    debug!("Marking similarity alert {} as dismissed", alert.id);

    let mut active_model = alert.into_active_model();
    active_model.is_dismissed = Set(true);

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Alerts on ideas authored by `owner_id` that have not been dismissed, newest first.
pub async fn find_active_by_owner(
    db: &impl ConnectionTrait,
    owner_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .join(JoinType::InnerJoin, Relation::Idea.def())
        .filter(ideas::Column::AuthorId.eq(owner_id))
        .filter(Column::IsDismissed.eq(false))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Reported alerts still awaiting a moderator, newest first.
pub async fn find_open_reports(db: &impl ConnectionTrait) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::IsReported.eq(true))
        .filter(Column::IsDismissed.eq(false))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Dismisses every open report filed against `similar_idea_id`.
///
/// Returns the number of alerts that changed.
pub async fn dismiss_reports_for_similar_idea(
    db: &impl ConnectionTrait,
    similar_idea_id: Id,
) -> Result<u64, Error> {
    let result = Entity::update_many()
        .col_expr(Column::IsDismissed, Expr::value(true))
        .filter(Column::SimilarIdeaId.eq(similar_idea_id))
        .filter(Column::IsReported.eq(true))
        .filter(Column::IsDismissed.eq(false))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Deletes every alert in which `idea_id` takes part, on either side of the pair.
pub async fn delete_referencing_idea(db: &impl ConnectionTrait, idea_id: Id) -> Result<u64, Error> {
    let result = Entity::delete_many()
        .filter(
            Condition::any()
                .add(Column::IdeaId.eq(idea_id))
                .add(Column::SimilarIdeaId.eq(idea_id)),
        )
        .exec(db)
        .await?;

    debug!(
        "Deleted {} similarity alerts referencing idea {idea_id}",
        result.rows_affected
    );

    Ok(result.rows_affected)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn alert_model() -> Model {
        Model {
            id: Id::new_v4(),
            idea_id: Id::new_v4(),
            similar_idea_id: Id::new_v4(),
            similarity_score: 0.72,
            is_reported: false,
            is_dismissed: false,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_if_absent_reports_whether_a_row_was_written() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let (idea_id, similar_idea_id) = (Id::new_v4(), Id::new_v4());

        assert!(create_if_absent(&db, idea_id, similar_idea_id, 0.72).await?);
        assert!(!create_if_absent(&db, idea_id, similar_idea_id, 0.72).await?);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert!(log[0].statements()[0]
            .sql
            .contains(r#"ON CONFLICT ("idea_id", "similar_idea_id") DO NOTHING"#));

        Ok(())
    }

    #[tokio::test]
    async fn mark_reported_sets_the_reported_flag() -> Result<(), Error> {
        let alert = alert_model();
        let reported = Model {
            is_reported: true,
            ..alert.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![reported.clone()]])
            .into_connection();

        let updated = mark_reported(&db, alert).await?;

        assert!(updated.is_reported);
        assert!(!updated.is_dismissed);

        Ok(())
    }

    #[tokio::test]
    async fn dismiss_reports_for_similar_idea_returns_rows_affected() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();

        assert_eq!(dismiss_reports_for_similar_idea(&db, Id::new_v4()).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn delete_referencing_idea_matches_either_side_of_the_pair() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            .into_connection();

        assert_eq!(delete_referencing_idea(&db, Id::new_v4()).await?, 3);

        let log = db.into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains(r#""similarity_alerts"."idea_id" = $1"#));
        assert!(sql.contains(r#"OR "similarity_alerts"."similar_idea_id" = $2"#));

        Ok(())
    }
}
