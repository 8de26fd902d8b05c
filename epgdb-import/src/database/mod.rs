//! Database module for the epg.db cache file.
//!
//! This module provides the SQLite access layer used by the importer:
//! - Schema creation for an empty cache (`create_empty`)
//! - Import connections with durability turned off (`open_for_import`)
//! - Source, service, event and text row operations
//! - Integrity checking

mod event;
mod models;
mod schema;
mod service;
mod source;

pub use models::*;
pub use schema::{DEFAULT_SOURCES, SCHEMA_SQL};

use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Busy timeout for import connections.
const IMPORT_BUSY_TIMEOUT: Duration = Duration::from_secs(20);
/// Busy timeout for schema creation and integrity checks.
const MAINTENANCE_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Database error types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database file not found: {0}")]
    NotFound(PathBuf),

    #[error("Database is locked: {0}")]
    Locked(String),

    #[error("Database is corrupt or not a database: {0}")]
    Corrupt(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DatabaseError {
    /// Discriminate the SQLite failures that matter while connecting.
    pub fn classify(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                DatabaseError::Locked(err.to_string())
            }
            Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => {
                DatabaseError::Corrupt(err.to_string())
            }
            Some(ErrorCode::PermissionDenied) | Some(ErrorCode::ReadOnly) => {
                DatabaseError::PermissionDenied(err.to_string())
            }
            _ => DatabaseError::Sqlite(err),
        }
    }

    /// Whether a later attempt may succeed (the dump may still be in progress).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::Locked(_) | DatabaseError::NotFound(_) | DatabaseError::Corrupt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Connection to an epg.db file.
pub struct EpgDatabase {
    conn: Connection,
    path: PathBuf,
}

impl EpgDatabase {
    /// Delete any existing file at `path` and create an empty cache database
    /// with the native schema and the default sources.
    pub fn create_empty<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("Creating empty EPG database: {}", path.display());

        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let mut conn = Connection::open(path)?;
        conn.busy_timeout(MAINTENANCE_BUSY_TIMEOUT)?;
        Self::initialize_schema(&mut conn)?;

        if let Err((_, e)) = conn.close() {
            log::warn!("Closing {} after schema creation failed: {}", path.display(), e);
        }
        Ok(())
    }

    /// Open an in-memory database with the native schema (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::initialize_schema(&mut conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    fn initialize_schema(conn: &mut Connection) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute_batch(schema::SCHEMA_SQL)?;
        for (id, name) in schema::DEFAULT_SOURCES {
            tx.execute(
                "INSERT INTO T_Source (id, source_name, priority) VALUES (?1, ?2, 0)",
                rusqlite::params![id, name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Open an existing cache file for a bulk import.
    ///
    /// The file must already exist. Synchronous writes are turned off and
    /// the rollback journal is kept in memory only: the cache is rebuilt
    /// from scratch whenever it is lost, so import speed wins over crash
    /// safety, but `ROLLBACK` still has to work for cancelled imports.
    pub fn open_for_import<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatabaseError::NotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(DatabaseError::classify)?;

        conn.busy_timeout(IMPORT_BUSY_TIMEOUT)
            .map_err(DatabaseError::classify)?;
        conn.pragma_update(None, "synchronous", "OFF")
            .map_err(DatabaseError::classify)?;
        let _mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get(0))
            .map_err(DatabaseError::classify)?;
        // Pragmas above don't necessarily read page 1; force a header check.
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(DatabaseError::classify)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Run `PRAGMA quick_check` on the file at `path`.
    ///
    /// Failures are reported in the returned text rather than as errors;
    /// a healthy database yields `"ok"`.
    pub fn check_integrity<P: AsRef<Path>>(path: P) -> String {
        let path = path.as_ref();
        log::info!("Checking EPG database: {}", path.display());

        let result = Self::quick_check(path).unwrap_or_else(|e| format!("[EPGDB] Error: {}", e));
        log::info!("Check result: {}", result);
        result
    }

    fn quick_check(path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(DatabaseError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(MAINTENANCE_BUSY_TIMEOUT)?;

        let mut stmt = conn.prepare("PRAGMA quick_check")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.concat())
    }

    /// Start the transaction that spans the whole import.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commit the import transaction.
    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("END")?;
        Ok(())
    }

    /// Discard everything written since [`begin`](Self::begin).
    pub fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Whether a transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Close the connection, logging (not returning) close failures.
    pub fn close(self) {
        let path = self.path;
        if let Err((_, e)) = self.conn.close() {
            log::warn!("Closing {} failed: {}", path.display(), e);
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the underlying connection (for advanced queries).
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Row counts of all import tables.
    pub fn table_counts(&self) -> Result<TableCounts> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
        };

        Ok(TableCounts {
            sources: count("T_Source")?,
            services: count("T_Service")?,
            events: count("T_Event")?,
            data: count("T_Data")?,
            titles: count("T_Title")?,
            short_descriptions: count("T_Short_Description")?,
            extended_descriptions: count("T_Extended_Description")?,
        })
    }
}

impl std::fmt::Debug for EpgDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpgDatabase")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = EpgDatabase::open_in_memory().unwrap();
        assert!(!db.in_transaction());
        let counts = db.table_counts().unwrap();
        assert_eq!(counts.sources, 5);
        assert_eq!(counts.events, 0);
    }

    #[test]
    fn test_create_empty_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.db");
        std::fs::write(&path, b"stale").unwrap();

        EpgDatabase::create_empty(&path).unwrap();
        assert_eq!(EpgDatabase::check_integrity(&path), "ok");

        let db = EpgDatabase::open_for_import(&path).unwrap();
        let sources = db.list_sources().unwrap();
        let ids: Vec<i64> = sources.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(sources[1].source_name, "DVB Now/Next Table");
        db.close();
    }

    #[test]
    fn test_create_empty_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.db");

        EpgDatabase::create_empty(&path).unwrap();
        let db = EpgDatabase::open_for_import(&path).unwrap();
        db.get_or_create_source("XMLTV", 99).unwrap();
        db.close();

        EpgDatabase::create_empty(&path).unwrap();
        let db = EpgDatabase::open_for_import(&path).unwrap();
        assert_eq!(db.table_counts().unwrap().sources, 5);
    }

    #[test]
    fn test_open_for_import_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EpgDatabase::open_for_import(dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_open_for_import_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("epg.db");
        std::fs::write(&path, vec![0x55u8; 30 * 1024]).unwrap();

        let err = EpgDatabase::open_for_import(&path).unwrap_err();
        assert!(matches!(err, DatabaseError::Corrupt(_)), "got {:?}", err);
    }

    #[test]
    fn test_check_integrity_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = EpgDatabase::check_integrity(dir.path().join("missing.db"));
        assert!(result.starts_with("[EPGDB] Error"));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let db = EpgDatabase::open_in_memory().unwrap();
        db.begin().unwrap();
        assert!(db.in_transaction());
        db.get_or_create_source("XMLTV", 99).unwrap();
        db.rollback().unwrap();
        assert!(!db.in_transaction());
        assert_eq!(db.table_counts().unwrap().sources, 5);
    }
}
