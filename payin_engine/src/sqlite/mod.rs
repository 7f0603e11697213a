//! SQLite backend for the pay-in engine.
mod sqlite_impl;

pub mod db;

use std::env;

use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};
pub use sqlite_impl::SqliteDatabase;

use crate::traits::IntentStoreError;

const SQLITE_DB_URL: &str = "sqlite://data/payin_store.db";

pub fn db_url() -> String {
    let result = env::var("PAYIN_DATABASE_URL").unwrap_or_else(|_| {
        info!("PAYIN_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, IntentStoreError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}

/// Creates the database file if it does not exist yet, so a fresh deployment can boot without manual setup.
pub async fn create_database_if_missing(url: &str) -> Result<(), IntentStoreError> {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        return Ok(());
    }
    Sqlite::create_database(url).await.map_err(|e| IntentStoreError::DatabaseError(e.to_string()))?;
    info!("Created Sqlite database {url}");
    Ok(())
}
