use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The unique pair turns a concurrent duplicate insert into a no-op
        // (INSERT ... ON CONFLICT DO NOTHING)
        let create_table_sql = "CREATE TABLE IF NOT EXISTS idea_platform.similarity_alerts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            idea_id UUID NOT NULL,
            similar_idea_id UUID NOT NULL,
            similarity_score DOUBLE PRECISION NOT NULL,
            is_reported BOOLEAN NOT NULL DEFAULT false,
            is_dismissed BOOLEAN NOT NULL DEFAULT false,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT similarity_alerts_idea_similar_idea_unique
                UNIQUE (idea_id, similar_idea_id),
            CONSTRAINT similarity_alerts_score_check
                CHECK (similarity_score >= 0 AND similarity_score <= 1),
            CONSTRAINT fk_similarity_alerts_idea
                FOREIGN KEY (idea_id)
                REFERENCES idea_platform.ideas(id)
                ON DELETE CASCADE,
            CONSTRAINT fk_similarity_alerts_similar_idea
                FOREIGN KEY (similar_idea_id)
                REFERENCES idea_platform.ideas(id)
                ON DELETE CASCADE
        )";

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        // Moderators look alerts up by the idea that was reported
        let create_similar_idea_index_sql =
            "CREATE INDEX IF NOT EXISTS similarity_alerts_similar_idea_id_idx
            ON idea_platform.similarity_alerts(similar_idea_id)";

        manager
            .get_connection()
            .execute_unprepared(create_similar_idea_index_sql)
            .await?;

        let create_open_reports_index_sql =
            "CREATE INDEX IF NOT EXISTS similarity_alerts_open_reports_idx
            ON idea_platform.similarity_alerts(created_at)
            WHERE is_reported AND NOT is_dismissed";

        manager
            .get_connection()
            .execute_unprepared(create_open_reports_index_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS idea_platform.similarity_alerts")
            .await?;

        Ok(())
    }
}
