//! SQL key-value store.
//!
//! Schema:
//! ```sql
//! CREATE TABLE key_value_pairs (
//!   key_name   VARBINARY(255) PRIMARY KEY,
//!   value_data TEXT NOT NULL
//! )
//! ```
//!
//! Keys compare byte for byte, like the cache does. `ensure_schema` refuses
//! an existing table whose key column uses a case- or pad-insensitive
//! collation, since such a table would alias keys the cache keeps apart.
//!
//! Through the `Any` driver MySQL `TEXT` columns decode as bytes, so text is
//! read as `String` first and `Vec<u8>` second.

use async_trait::async_trait;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{error, info};

use super::{DbError, KvBackend, SqlConnectionManager};
use crate::pool::{Pool, PoolStats, PooledConnection};

const CREATE_TABLE_MYSQL: &str = r#"
    CREATE TABLE IF NOT EXISTS key_value_pairs (
        key_name VARBINARY(255) PRIMARY KEY,
        value_data TEXT NOT NULL
    )
"#;

const CREATE_TABLE_SQLITE: &str = r#"
    CREATE TABLE IF NOT EXISTS key_value_pairs (
        key_name TEXT COLLATE BINARY PRIMARY KEY,
        value_data TEXT NOT NULL
    )
"#;

const KEY_COLUMN_MYSQL: &str = r#"
    SELECT DATA_TYPE, COLLATION_NAME FROM information_schema.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE()
      AND TABLE_NAME = 'key_value_pairs'
      AND COLUMN_NAME = 'key_name'
"#;

const TABLE_DDL_SQLITE: &str =
    "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'key_value_pairs'";

const SELECT_COUNT: &str = "SELECT COUNT(*) FROM key_value_pairs WHERE key_name = ?";
const INSERT: &str = "INSERT INTO key_value_pairs (key_name, value_data) VALUES (?, ?)";
const SELECT_VALUE: &str = "SELECT value_data FROM key_value_pairs WHERE key_name = ?";
const UPDATE: &str = "UPDATE key_value_pairs SET value_data = ? WHERE key_name = ?";
const DELETE: &str = "DELETE FROM key_value_pairs WHERE key_name = ?";

/// Pooled SQL implementation of [`KvBackend`].
#[derive(Clone)]
pub struct KvDatabase {
    pool: Pool<SqlConnectionManager>,
}

impl KvDatabase {
    /// Opens a pool of `pool_size` connections to `url`.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self, DbError> {
        let pool = Pool::initialize(SqlConnectionManager::new(url), pool_size).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: Pool<SqlConnectionManager>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<SqlConnectionManager> {
        &self.pool
    }

    /// Creates the `key_value_pairs` table if it does not exist and checks
    /// that its key column compares keys byte for byte.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        let sql = if self.pool.manager().is_sqlite() {
            CREATE_TABLE_SQLITE
        } else {
            CREATE_TABLE_MYSQL
        };

        let mut conn = self.pool.acquire().await?;
        sqlx::query(sql).execute(&mut *conn).await?;
        self.check_key_column(&mut conn).await?;
        info!("schema ready");
        Ok(())
    }

    /// Fails if `key_name` would treat keys differing only in case or
    /// trailing spaces as equal.
    async fn check_key_column(
        &self,
        conn: &mut PooledConnection<SqlConnectionManager>,
    ) -> Result<(), DbError> {
        if self.pool.manager().is_sqlite() {
            let row = sqlx::query(TABLE_DDL_SQLITE).fetch_one(&mut **conn).await?;
            let ddl = decode_text(&row, 0)?.unwrap_or_default();
            if !sqlite_key_column_is_exact(&ddl) {
                return Err(DbError::Schema(format!(
                    "key_name must compare keys exactly, found: {}",
                    ddl.trim()
                )));
            }
            return Ok(());
        }

        let row = sqlx::query(KEY_COLUMN_MYSQL)
            .fetch_optional(&mut **conn)
            .await?
            .ok_or_else(|| DbError::Schema("key_value_pairs.key_name is missing".to_string()))?;
        let data_type = decode_text(&row, 0)?.unwrap_or_default();
        let collation = decode_text(&row, 1)?;
        if !mysql_key_column_is_exact(collation.as_deref()) {
            return Err(DbError::Schema(format!(
                "key_name {} uses collation {}; recreate it as VARBINARY(255)",
                data_type,
                collation.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Drains and closes pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn checkout(
        &self,
        op: &'static str,
        key: &str,
    ) -> Result<PooledConnection<SqlConnectionManager>, DbError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| failure(op, key, DbError::Pool(e)))
    }
}

/// Logs a backend failure with its key and operation.
fn failure(op: &'static str, key: &str, err: DbError) -> DbError {
    error!(op, key, error = %err, "database operation failed");
    err
}

fn is_duplicate_key(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            // 1555/2067: SQLite primary key / unique constraint codes
            db.is_unique_violation()
                || matches!(db.code().as_deref(), Some("23000" | "1555" | "2067"))
        }
        _ => false,
    }
}

fn decode_text(row: &AnyRow, index: usize) -> Result<Option<String>, sqlx::Error> {
    row.try_get::<Option<String>, _>(index).or_else(|_| {
        row.try_get::<Option<Vec<u8>>, _>(index)
            .map(|bytes| bytes.map(|b| String::from_utf8_lossy(&b).into_owned()))
    })
}

fn decode_value(row: &AnyRow) -> Result<String, sqlx::Error> {
    decode_text(row, 0).map(Option::unwrap_or_default)
}

/// Binary string types carry no collation; `*_0900_bin` is the only
/// binary collation without PAD SPACE.
fn mysql_key_column_is_exact(collation: Option<&str>) -> bool {
    match collation {
        None => true,
        Some(c) => c.eq_ignore_ascii_case("binary") || c.ends_with("_0900_bin"),
    }
}

fn sqlite_key_column_is_exact(ddl: &str) -> bool {
    let ddl = ddl.to_ascii_uppercase();
    let column = ddl
        .split(',')
        .find(|part| part.contains("KEY_NAME"))
        .unwrap_or_default();
    !column.contains("NOCASE") && !column.contains("RTRIM")
}

#[async_trait]
impl KvBackend for KvDatabase {
    async fn exists(&self, key: &str) -> Result<bool, DbError> {
        let mut conn = self.checkout("exists", key).await?;
        let count: i64 = sqlx::query_scalar(SELECT_COUNT)
            .bind(key)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| failure("exists", key, e.into()))?;
        Ok(count > 0)
    }

    async fn create(&self, key: &str, value: &str) -> Result<bool, DbError> {
        let mut conn = self.checkout("create", key).await?;
        match sqlx::query(INSERT)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await
        {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(failure("create", key, e.into())),
        }
    }

    async fn read(&self, key: &str) -> Result<Option<String>, DbError> {
        let mut conn = self.checkout("read", key).await?;
        let row = sqlx::query(SELECT_VALUE)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| failure("read", key, e.into()))?;

        row.as_ref()
            .map(decode_value)
            .transpose()
            .map_err(|e| failure("read", key, e.into()))
    }

    async fn update(&self, key: &str, value: &str) -> Result<bool, DbError> {
        let mut conn = self.checkout("update", key).await?;
        let result = sqlx::query(UPDATE)
            .bind(value)
            .bind(key)
            .execute(&mut *conn)
            .await
            .map_err(|e| failure("update", key, e.into()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool, DbError> {
        let mut conn = self.checkout("delete", key).await?;
        let result = sqlx::query(DELETE)
            .bind(key)
            .execute(&mut *conn)
            .await
            .map_err(|e| failure("delete", key, e.into()))?;
        Ok(result.rows_affected() > 0)
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(self.pool.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolError;
    use crate::test_support::sqlite_database;

    #[tokio::test]
    async fn test_create_and_read() {
        let (db, _dir) = sqlite_database(2).await;

        assert!(db.create("alpha", "one").await.unwrap());
        assert_eq!(db.read("alpha").await.unwrap(), Some("one".to_string()));
        assert!(db.exists("alpha").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (db, _dir) = sqlite_database(2).await;

        assert_eq!(db.read("missing").await.unwrap(), None);
        assert!(!db.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_duplicate_returns_false() {
        let (db, _dir) = sqlite_database(2).await;

        assert!(db.create("dup", "first").await.unwrap());
        assert!(!db.create("dup", "second").await.unwrap());
        assert_eq!(db.read("dup").await.unwrap(), Some("first".to_string()));
    }

    #[tokio::test]
    async fn test_update() {
        let (db, _dir) = sqlite_database(2).await;

        assert!(!db.update("ghost", "value").await.unwrap());
        assert!(!db.exists("ghost").await.unwrap());

        db.create("key", "old").await.unwrap();
        assert!(db.update("key", "new").await.unwrap());
        assert_eq!(db.read("key").await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, _dir) = sqlite_database(2).await;

        db.create("key", "value").await.unwrap();
        assert!(db.delete("key").await.unwrap());
        assert!(!db.delete("key").await.unwrap());
        assert_eq!(db.read("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_case_sensitive() {
        let (db, _dir) = sqlite_database(2).await;

        db.create("Key", "upper").await.unwrap();
        assert!(db.create("key", "lower").await.unwrap());
        assert_eq!(db.read("Key").await.unwrap(), Some("upper".to_string()));
        assert_eq!(db.read("key").await.unwrap(), Some("lower".to_string()));
    }

    #[tokio::test]
    async fn test_statement_failure_releases_connection() {
        let (db, _dir) = sqlite_database(2).await;
        {
            let mut conn = db.pool().acquire().await.unwrap();
            sqlx::query("DROP TABLE key_value_pairs")
                .execute(&mut *conn)
                .await
                .unwrap();
        }

        assert!(matches!(
            db.create("k", "v").await,
            Err(DbError::Statement(_))
        ));
        assert!(matches!(db.read("k").await, Err(DbError::Statement(_))));
        assert!(matches!(db.exists("k").await, Err(DbError::Statement(_))));
        assert_eq!(db.pool_stats().unwrap().in_use, 0);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_pool_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("missing").join("kv.db").display()
        );
        let db = KvDatabase::connect(&url, 1).await.unwrap();

        let result = db.read("k").await;
        assert!(matches!(result, Err(DbError::Pool(PoolError::Connect(_)))));
        assert_eq!(db.pool_stats().unwrap().in_use, 0);
    }

    #[tokio::test]
    async fn test_close_rejects_operations() {
        let (db, _dir) = sqlite_database(2).await;

        db.close().await;

        assert!(matches!(
            db.read("k").await,
            Err(DbError::Pool(PoolError::Closed))
        ));
    }

    #[tokio::test]
    async fn test_case_insensitive_key_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("kv.db").display());
        let db = KvDatabase::connect(&url, 1).await.unwrap();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            sqlx::query(
                "CREATE TABLE key_value_pairs (
                    key_name TEXT COLLATE NOCASE PRIMARY KEY,
                    value_data TEXT NOT NULL
                )",
            )
            .execute(&mut *conn)
            .await
            .unwrap();
        }

        assert!(matches!(db.ensure_schema().await, Err(DbError::Schema(_))));
        assert_eq!(db.pool_stats().unwrap().in_use, 0);
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let (db, _dir) = sqlite_database(1).await;
        db.create("k", "v").await.unwrap();

        db.ensure_schema().await.unwrap();
        assert_eq!(db.read("k").await.unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_mysql_key_column_is_binary() {
        assert!(CREATE_TABLE_MYSQL.contains("key_name VARBINARY(255)"));

        assert!(mysql_key_column_is_exact(None));
        assert!(mysql_key_column_is_exact(Some("binary")));
        assert!(mysql_key_column_is_exact(Some("utf8mb4_0900_bin")));
        assert!(!mysql_key_column_is_exact(Some("utf8mb4_0900_ai_ci")));
        assert!(!mysql_key_column_is_exact(Some("utf8mb4_general_ci")));
        assert!(!mysql_key_column_is_exact(Some("utf8mb4_bin")));
    }

    #[test]
    fn test_sqlite_key_column_collation() {
        assert!(sqlite_key_column_is_exact(CREATE_TABLE_SQLITE));
        assert!(sqlite_key_column_is_exact(
            "CREATE TABLE key_value_pairs (key_name TEXT PRIMARY KEY, value_data TEXT COLLATE NOCASE)"
        ));
        assert!(!sqlite_key_column_is_exact(
            "CREATE TABLE key_value_pairs (key_name TEXT COLLATE nocase PRIMARY KEY, value_data TEXT)"
        ));
        assert!(!sqlite_key_column_is_exact(
            "CREATE TABLE key_value_pairs (key_name TEXT COLLATE RTRIM PRIMARY KEY, value_data TEXT)"
        ));
    }
}
