pub use sea_orm_migration::prelude::*;

mod m20260901_000000_create_schema_and_users;
mod m20260901_000001_create_ideas;
mod m20260901_000002_create_similarity_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000000_create_schema_and_users::Migration),
            Box::new(m20260901_000001_create_ideas::Migration),
            Box::new(m20260901_000002_create_similarity_alerts::Migration),
        ]
    }
}
