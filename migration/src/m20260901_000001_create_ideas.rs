use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The embedding is a JSON array of floats, written together with the idea
        let create_table_sql = "CREATE TABLE IF NOT EXISTS idea_platform.ideas (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            author_id UUID NOT NULL,
            title VARCHAR(255) NOT NULL,
            short_description TEXT NOT NULL,
            full_description TEXT NOT NULL,
            is_paid BOOLEAN NOT NULL DEFAULT false,
            price BIGINT NOT NULL DEFAULT 0,
            document_ref VARCHAR(1024),
            embedding JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT ideas_price_check CHECK (price >= 0),
            CONSTRAINT fk_ideas_author
                FOREIGN KEY (author_id)
                REFERENCES idea_platform.users(id)
                ON DELETE CASCADE
        )";

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        // Author listings and the corpus scan both read in created_at order
        let create_author_index_sql = "CREATE INDEX IF NOT EXISTS ideas_author_id_created_at_idx
            ON idea_platform.ideas(author_id, created_at)";

        manager
            .get_connection()
            .execute_unprepared(create_author_index_sql)
            .await?;

        let create_created_at_index_sql = "CREATE INDEX IF NOT EXISTS ideas_created_at_idx
            ON idea_platform.ideas(created_at)";

        manager
            .get_connection()
            .execute_unprepared(create_created_at_index_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS idea_platform.ideas")
            .await?;

        Ok(())
    }
}
