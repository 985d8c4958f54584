use log::{error, info};
use migration::{Migrator, MigratorTrait};
use sea_orm::ConnectionTrait;
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    let db = match service::init_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    // The connection's search path only names our schema, and the migration
    // bookkeeping table is created there before any migration runs.
    let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {};", service::DB_SCHEMA);
    if let Err(e) = db.execute_unprepared(&create_schema).await {
        error!("Failed to create schema {}: {e}", service::DB_SCHEMA);
        std::process::exit(1);
    }

    match Migrator::get_pending_migrations(&db).await {
        Ok(pending) => info!("Applying {} pending migrations", pending.len()),
        Err(e) => {
            error!("Failed to read migration status: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to apply migrations: {e}");
        std::process::exit(1);
    }

    info!("Database schema is up to date");
}
