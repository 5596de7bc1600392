use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info};

use crate::database::schema::{CURRENT_VERSION, MIGRATIONS, SCHEMA};
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub memo: Option<String>,
    pub created_at: String,
}

/// Owns the catalog database. Every mutation goes through `&mut self`, so a
/// single store is the single writer.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Opens (or creates) the catalog at `path` and brings its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening catalog at {:?}", path);
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let mut store = Self { conn };
        store.initialize()?;
        store.migrate()?;
        Ok(store)
    }

    /// Creates missing tables, indexes and the version row. Safe to call repeatedly.
    ///
    /// When the version row is missing it is seeded from the shape of `files`:
    /// a table without `memo` predates versioning and starts at 0.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;

        let seed = if column_exists(&self.conn, "files", "memo")? {
            CURRENT_VERSION
        } else {
            0
        };
        let inserted = self.conn.execute(
            "INSERT INTO version (version) SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM version)",
            params![seed],
        )?;
        if inserted > 0 {
            debug!("Seeded schema version {}", seed);
        }
        Ok(())
    }

    /// Applies every migration between the stored version and `CURRENT_VERSION`.
    /// Each step commits together with its version bump.
    pub fn migrate(&mut self) -> Result<()> {
        let stored = self.version()?;
        if stored > CURRENT_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                stored,
                supported: CURRENT_VERSION,
            });
        }

        for from in stored.max(0)..CURRENT_VERSION {
            let tx = self.conn.transaction()?;
            tx.execute_batch(MIGRATIONS[from as usize])?;
            tx.execute("UPDATE version SET version = ?1", params![from + 1])?;
            tx.commit()?;
            info!("Migrated catalog schema v{} -> v{}", from, from + 1);
        }
        Ok(())
    }

    pub fn version(&self) -> Result<i64> {
        let version = self
            .conn
            .query_row("SELECT version FROM version LIMIT 1", [], |row| row.get(0))?;
        Ok(version)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    pub fn get_file(&self, file_id: i64) -> Result<Option<FileRecord>> {
        get_file(&self.conn, file_id)
    }
}

pub fn insert_file(
    conn: &Connection,
    filename: &str,
    filepath: &str,
    memo: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO files (filename, filepath, memo) VALUES (?1, ?2, ?3)",
        params![filename, filepath, memo],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns `false` when no row has `file_id`.
pub fn update_file(
    conn: &Connection,
    file_id: i64,
    filename: &str,
    filepath: &str,
    memo: Option<&str>,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE files SET filename = ?1, filepath = ?2, memo = ?3 WHERE id = ?4",
        params![filename, filepath, memo, file_id],
    )?;
    Ok(changed > 0)
}

pub fn get_file(conn: &Connection, file_id: i64) -> Result<Option<FileRecord>> {
    let record = conn
        .query_row(
            "SELECT id, filename, filepath, memo, created_at FROM files WHERE id = ?1",
            params![file_id],
            |row| {
                Ok(FileRecord {
                    id: row.get(0)?,
                    filename: row.get(1)?,
                    filepath: row.get(2)?,
                    memo: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn file_exists(conn: &Connection, file_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM files WHERE id = ?1)",
        params![file_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2)",
        params![table, column],
        |row| row.get(0),
    )?;
    Ok(exists)
}
