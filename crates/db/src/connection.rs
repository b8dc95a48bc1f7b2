use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use cotiza_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens a pool using the values from the `[database]` config section.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| Box::pin(prepare_connection(conn)))
        .connect(database_url)
        .await
}

/// SQLite ships with foreign keys off; the line-item cascade and the
/// RESTRICT on catalog items depend on them, so every connection turns
/// them on before it joins the pool.
async fn prepare_connection(conn: &mut sqlx::SqliteConnection) -> Result<(), sqlx::Error> {
    for pragma in [
        "PRAGMA foreign_keys = ON",
        "PRAGMA journal_mode = WAL",
        "PRAGMA busy_timeout = 5000",
    ] {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }
    Ok(())
}
