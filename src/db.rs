use std::str::FromStr;

use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use tracing::info;

/// Opens a pool on `url`, creating the database file first if needed.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    // Check if the database exists, if not, create it
    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        info!("Creating database {url}");
        Sqlite::create_database(url).await?;
    } else {
        info!("Database already exists");
    }

    let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    info!("Connection to the database is successful");
    Ok(pool)
}

/// Single-connection in-memory database. The connection is never recycled,
/// since dropping it would drop the data with it.
pub async fn in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE
    );"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL UNIQUE,
        text TEXT NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT 0
    );"#,
    )
    .execute(pool)
    .await?;

    info!("Notes schema is up to date");
    Ok(())
}
