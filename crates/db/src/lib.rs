use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::{ConnectionTrait, DbErr, Order};

pub mod entities;
pub mod filter;
pub mod models;
pub mod types;

/// Connection handle passed explicitly to handlers and models; there is no
/// global store state.
#[derive(Clone)]
pub struct DBService {
    pub conn: DatabaseConnection,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url);
        options.sqlx_logging(false);
        let conn = Database::connect(options).await?;
        tracing::debug!("Connected to {database_url}, applying pending migrations");
        db_migration::Migrator::up(&conn, None).await?;
        Ok(DBService { conn })
    }
}
