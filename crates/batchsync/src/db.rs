//! Database connection utilities.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};

/// Pragmas applied to every SQLite connection.
///
/// WAL lets the CLI read history while a run is writing it, the busy
/// timeout absorbs short lock contention, and NORMAL sync is safe under WAL.
const SQLITE_PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode=WAL",
    "PRAGMA busy_timeout=5000",
    "PRAGMA synchronous=NORMAL",
];

async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in SQLITE_PRAGMAS {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// Establish a connection to the database.
///
/// SQLite connections (including `sqlite::memory:`) get [`SQLITE_PRAGMAS`].
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    if db.get_database_backend() == DatabaseBackend::Sqlite {
        configure_sqlite(&db).await?;
    }
    tracing::debug!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

/// Connect and bring the `batch_sync_configs` schema up to date.
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established or migrations fail.
///
/// # Example
/// ```ignore
/// let db = batchsync::connect_and_migrate("sqlite://batchsync.db?mode=rwc").await?;
/// let store = batchsync::DatabaseConfigStore::new(std::sync::Arc::new(db));
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
