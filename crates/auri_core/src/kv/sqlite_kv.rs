//! SQLite-backed key-value storage over the `kv_entries` table.

use super::{KvBackend, KvError, KvResult};
use crate::db::{open_db, open_db_in_memory, DbResult};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Key-value backend persisting into a migrated SQLite database.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (or creates) a database file and applies migrations.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens an in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KvError::Backend("sqlite connection lock poisoned".to_string()))
    }
}

impl KvBackend for SqliteKv {
    fn get(&self, key: &str) -> KvResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_entries WHERE key = ?1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|err| map_sqlite_error(key, 0, err))
    }

    fn set(&self, key: &str, value: &str) -> KvResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )
        .map_err(|err| map_sqlite_error(key, value.len(), err))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> KvResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])
            .map_err(|err| map_sqlite_error(key, 0, err))?;
        Ok(())
    }
}

fn map_sqlite_error(key: &str, needed_bytes: usize, err: rusqlite::Error) -> KvError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DiskFull) => KvError::QuotaExceeded {
            key: key.to_string(),
            needed_bytes,
        },
        _ => KvError::Backend(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKv;
    use crate::kv::KvBackend;

    #[test]
    fn set_get_overwrite_and_remove() {
        let kv = SqliteKv::open_in_memory().unwrap();
        assert_eq!(kv.get("k").unwrap(), None);

        kv.set("k", "[1]").unwrap();
        kv.set("k", "[1,2]").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("[1,2]"));

        kv.remove("k").unwrap();
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auri.sqlite3");

        SqliteKv::open(&path).unwrap().set("k", "v").unwrap();
        let reopened = SqliteKv::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }
}
