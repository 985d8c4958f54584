use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the platform's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS idea_platform;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO idea_platform, public;")
            .await?;

        // Let the application user work with everything created in the schema
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL ON SCHEMA idea_platform TO idea;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA idea_platform GRANT ALL ON TABLES TO idea;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA idea_platform GRANT ALL ON SEQUENCES TO idea;
                END $$;
            "#,
            )
            .await?;

        // Roles are stored as plain strings so that new roles need no type migration
        let create_table_sql = "CREATE TABLE IF NOT EXISTS idea_platform.users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email VARCHAR(255) NOT NULL UNIQUE,
            username VARCHAR(255) NOT NULL UNIQUE,
            first_name VARCHAR(255),
            last_name VARCHAR(255),
            role VARCHAR(16) NOT NULL DEFAULT 'user',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT users_role_check CHECK (role IN ('user', 'admin'))
        )";

        manager
            .get_connection()
            .execute_unprepared(create_table_sql)
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS idea_platform.users")
            .await?;

        // Drop the schema (CASCADE will remove all objects in it)
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS idea_platform CASCADE;")
            .await?;

        Ok(())
    }
}
