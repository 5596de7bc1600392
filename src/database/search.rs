use std::path::Path;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    /// Tag names joined with `,` in ordinal order. Empty when untagged.
    pub tags: String,
    pub memo: Option<String>,
    pub created_at: String,
}

impl FileEntry {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.split(',').filter(|t| !t.is_empty()).collect()
    }

    pub fn is_dir(&self) -> bool {
        Path::new(&self.filepath).is_dir()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagUsage {
    pub id: i64,
    pub name: String,
    pub count: i64,
}

const SEARCH_QUERY: &str = "
    SELECT
        f.id,
        f.filename,
        f.filepath,
        COALESCE(GROUP_CONCAT(m.tag_name, ',' ORDER BY j.number_of), '') AS tags,
        f.memo,
        f.created_at
    FROM files f
    LEFT JOIN file_tags j ON f.id = j.file_id
    LEFT JOIN tag_mng m ON m.id = j.tag_id
    GROUP BY f.id
    HAVING (?1 = '' OR LOWER(f.filename) LIKE ?2 ESCAPE '\\')
       AND (?3 = '' OR LOWER(tags) LIKE ?4 ESCAPE '\\')
    ORDER BY f.filename, f.id
";

/// Lists files with their tags. Both filters are case-insensitive substrings;
/// an empty filter matches every file.
///
/// Case folding covers ASCII letters only, so `"ä"` does not match `"Ä"`.
pub fn search(conn: &Connection, name_filter: &str, tag_filter: &str) -> Result<Vec<FileEntry>> {
    let name = name_filter.to_ascii_lowercase();
    let tag = tag_filter.to_ascii_lowercase();

    let mut stmt = conn.prepare_cached(SEARCH_QUERY)?;
    let rows = stmt.query_map(
        params![name, contains_pattern(&name), tag, contains_pattern(&tag)],
        |row| {
            Ok(FileEntry {
                id: row.get(0)?,
                filename: row.get(1)?,
                filepath: row.get(2)?,
                tags: row.get(3)?,
                memo: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Tag names of one file in ordinal order.
pub fn tags_for_file(conn: &Connection, file_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT m.tag_name FROM file_tags j
         JOIN tag_mng m ON m.id = j.tag_id
         WHERE j.file_id = ?1
         ORDER BY j.number_of",
    )?;
    let rows = stmt.query_map(params![file_id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn list_tags_with_usage_counts(conn: &Connection) -> Result<Vec<TagUsage>> {
    let mut stmt = conn.prepare_cached(
        "SELECT mng.id, mng.tag_name, COUNT(j.file_id) AS count
         FROM tag_mng mng
         LEFT JOIN file_tags j ON mng.id = j.tag_id
         GROUP BY mng.id, mng.tag_name
         ORDER BY mng.tag_name, mng.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TagUsage {
            id: row.get(0)?,
            name: row.get(1)?,
            count: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// `LIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::{insert_file, CatalogStore};

    fn seeded() -> Result<(CatalogStore, i64, i64, i64)> {
        let mut store = CatalogStore::open_in_memory()?;
        let conn = store.connection();
        let beach = insert_file(conn, "beach.jpg", "/pics/beach.jpg", Some("summer trip"))?;
        let notes = insert_file(conn, "Notes.txt", "/docs/Notes.txt", None)?;
        let archive = insert_file(conn, "archive_2024", "/backup/archive_2024", None)?;

        store.relink_tags(beach, &["photo".to_string(), "misc".to_string()])?;
        store.relink_tags(notes, &["Work".to_string()])?;
        Ok((store, beach, notes, archive))
    }

    fn ids(entries: &[FileEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_empty_filters_list_everything_by_name() -> Result<()> {
        let (store, beach, notes, archive) = seeded()?;
        let all = search(store.connection(), "", "")?;

        // SQLite sorts by byte value, so upper-case names come first.
        assert_eq!(ids(&all), vec![notes, archive, beach]);
        assert_eq!(all[2].tags, "photo,misc");
        assert_eq!(all[2].memo.as_deref(), Some("summer trip"));
        assert_eq!(all[1].tags, "");
        assert!(all[1].tag_list().is_empty());
        Ok(())
    }

    #[test]
    fn test_tags_follow_ordinal_order() -> Result<()> {
        let mut store = CatalogStore::open_in_memory()?;
        let file = insert_file(store.connection(), "f", "/f", None)?;
        // Register "zeta" first so its tag id is lower than "alpha".
        store.resolve_or_create_tag("zeta")?;
        store.relink_tags(file, &["alpha".to_string(), "zeta".to_string()])?;

        let entries = search(store.connection(), "", "")?;
        assert_eq!(entries[0].tag_list(), vec!["alpha", "zeta"]);
        Ok(())
    }

    #[test]
    fn test_tag_filter_matches_substring() -> Result<()> {
        let (store, beach, _, _) = seeded()?;
        assert_eq!(ids(&search(store.connection(), "", "ph")?), vec![beach]);
        assert_eq!(ids(&search(store.connection(), "", "O,MI")?), vec![beach]);
        Ok(())
    }

    #[test]
    fn test_filters_are_case_insensitive_and_combined() -> Result<()> {
        let (store, _, notes, _) = seeded()?;
        let conn = store.connection();
        assert_eq!(ids(&search(conn, "NOTES", "")?), vec![notes]);
        assert_eq!(ids(&search(conn, "notes", "work")?), vec![notes]);
        assert!(search(conn, "notes", "photo")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_wildcards_match_literally() -> Result<()> {
        let (store, _, _, archive) = seeded()?;
        let conn = store.connection();
        assert_eq!(ids(&search(conn, "_", "")?), vec![archive]);
        assert!(search(conn, "%", "")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_tag_filter_excludes_untagged_files() -> Result<()> {
        let (store, _, _, archive) = seeded()?;
        let hits = search(store.connection(), "", "a")?;
        assert!(!ids(&hits).contains(&archive));
        Ok(())
    }

    #[test]
    fn test_case_folding_is_ascii_only() -> Result<()> {
        let mut store = CatalogStore::open_in_memory()?;
        let file = insert_file(store.connection(), "Äpfel.txt", "/Äpfel.txt", None)?;
        store.relink_tags(file, &["Öl".to_string()])?;
        let conn = store.connection();

        assert!(search(conn, "äpfel", "")?.is_empty());
        assert!(search(conn, "", "öl")?.is_empty());
        assert_eq!(ids(&search(conn, "ÄPFEL", "")?), vec![file]);
        assert_eq!(ids(&search(conn, "", "Öl")?), vec![file]);
        Ok(())
    }

    #[test]
    fn test_tags_for_file_in_ordinal_order() -> Result<()> {
        let (store, beach, _, archive) = seeded()?;
        assert_eq!(tags_for_file(store.connection(), beach)?, vec!["photo", "misc"]);
        assert!(tags_for_file(store.connection(), archive)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_usage_counts() -> Result<()> {
        let (mut store, beach, notes, _) = seeded()?;
        store.relink_tags(notes, &["Work".to_string(), "photo".to_string()])?;
        store.resolve_or_create_tag("unused")?;
        store.delete_file(beach)?;

        let usage = list_tags_with_usage_counts(store.connection())?;
        let summary: Vec<(&str, i64)> = usage.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(summary, vec![("Work", 1), ("misc", 0), ("photo", 1), ("unused", 0)]);
        Ok(())
    }

    #[test]
    fn test_contains_pattern_escapes() {
        assert_eq!(contains_pattern("a_b%c\\"), "%a\\_b\\%c\\\\%");
        assert_eq!(contains_pattern(""), "%%");
    }
}
