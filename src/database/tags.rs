use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::database::store::{self, CatalogStore};
use crate::error::{CatalogError, Result};

/// Returns the id of the tag named exactly `name`, creating the registry row
/// on first use.
pub fn resolve_or_create_tag(conn: &Connection, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM tag_mng WHERE tag_name = ?1 ORDER BY id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute("INSERT INTO tag_mng (tag_name) VALUES (?1)", params![name])?;
    let id = conn.last_insert_rowid();
    debug!("Created tag '{}' with id {}", name, id);
    Ok(id)
}

/// Replaces the associations of `file_id` with `names`, in order.
///
/// Blank entries are skipped and do not consume an ordinal. A name repeated
/// later in the list keeps the ordinal of its first occurrence.
pub fn relink(conn: &Connection, file_id: i64, names: &[String]) -> Result<usize> {
    conn.execute("DELETE FROM file_tags WHERE file_id = ?1", params![file_id])?;

    let mut stmt_link = conn.prepare_cached(
        "INSERT OR IGNORE INTO file_tags (file_id, tag_id, number_of) VALUES (?1, ?2, ?3)",
    )?;

    let mut linked = 0;
    let names = names.iter().map(|n| n.trim()).filter(|n| !n.is_empty());
    for (number_of, name) in names.enumerate() {
        let tag_id = resolve_or_create_tag(conn, name)?;
        linked += stmt_link.execute(params![file_id, tag_id, number_of as i64])?;
    }
    Ok(linked)
}

/// Deletes every registry row named `name` together with its associations.
pub fn delete_tag(conn: &Connection, name: &str) -> Result<bool> {
    let ids = {
        let mut stmt = conn.prepare("SELECT id FROM tag_mng WHERE tag_name = ?1")?;
        let rows = stmt.query_map(params![name], |row| row.get::<_, i64>(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    if ids.is_empty() {
        return Ok(false);
    }

    for id in &ids {
        conn.execute("DELETE FROM file_tags WHERE tag_id = ?1", params![id])?;
        conn.execute("DELETE FROM tag_mng WHERE id = ?1", params![id])?;
    }
    Ok(true)
}

pub fn delete_file(conn: &Connection, file_id: i64) -> Result<()> {
    conn.execute("DELETE FROM file_tags WHERE file_id = ?1", params![file_id])?;
    conn.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
    Ok(())
}

impl CatalogStore {
    pub fn resolve_or_create_tag(&mut self, name: &str) -> Result<i64> {
        resolve_or_create_tag(self.connection(), name)
    }

    /// Atomically replaces the tag list of a registered file.
    pub fn relink_tags(&mut self, file_id: i64, names: &[String]) -> Result<()> {
        let tx = self.transaction()?;
        if !store::file_exists(&tx, file_id)? {
            return Err(CatalogError::FileNotFound(file_id));
        }
        let linked = relink(&tx, file_id, names)?;
        tx.commit()?;
        debug!("File {} now has {} tags", file_id, linked);
        Ok(())
    }

    /// `false` means no tag had that name and nothing changed.
    pub fn delete_tag(&mut self, name: &str) -> Result<bool> {
        let tx = self.transaction()?;
        let deleted = delete_tag(&tx, name)?;
        tx.commit()?;
        if deleted {
            info!("Deleted tag '{}'", name);
        }
        Ok(deleted)
    }

    pub fn delete_file(&mut self, file_id: i64) -> Result<()> {
        let tx = self.transaction()?;
        delete_file(&tx, file_id)?;
        tx.commit()?;
        info!("Deleted file {}", file_id);
        Ok(())
    }
}
