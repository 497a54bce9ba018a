//! Shared fixtures for unit tests.

use tempfile::TempDir;

use crate::db::KvDatabase;

/// A schema-ready SQLite database in a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the database is used.
pub async fn sqlite_database(pool_size: usize) -> (KvDatabase, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("kv.db").display());
    let db = KvDatabase::connect(&url, pool_size).await.unwrap();
    db.ensure_schema().await.unwrap();
    (db, dir)
}
