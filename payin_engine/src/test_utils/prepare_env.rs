use log::*;

use crate::SqliteDatabase;

/// A fresh, fully migrated in-memory database.
pub async fn new_test_database() -> SqliteDatabase {
    let db = SqliteDatabase::new_in_memory().await.expect("Error creating in-memory database");
    debug!("🚀️ Test database ready");
    db
}
