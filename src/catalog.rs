use std::path::Path;

use tracing::{info, warn};

use crate::database::info::{self as schema_info, ColumnInfo, TableRecords, TableSummary};
use crate::database::{search, store, tags, CatalogStore, FileEntry, FileRecord, TagUsage};
use crate::error::{CatalogError, Result};

/// What the user filled in for one file. `tags` is the raw comma-separated text.
#[derive(Debug, Clone, Default)]
pub struct FileInput {
    pub name: String,
    pub path: String,
    pub memo: Option<String>,
    pub tags: String,
}

/// A partial change to a registered file. `None` keeps the stored memo or
/// tags; `Some("")` clears them.
#[derive(Debug, Clone, Default)]
pub struct FileEdit {
    pub name: String,
    pub path: String,
    pub memo: Option<String>,
    pub tags: Option<String>,
}

/// Splits user-typed tag text on commas, trimming and dropping blanks.
pub fn parse_tag_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct Catalog {
    store: CatalogStore,
}

impl Catalog {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(CatalogStore::open(db_path)?))
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Registers an existing file or folder. A blank name falls back to the
    /// last component of the path.
    pub fn register(&mut self, input: &FileInput) -> Result<i64> {
        let path = input.path.trim();
        if path.is_empty() {
            return Err(CatalogError::Validation("path is required".into()));
        }
        if !Path::new(path).exists() {
            warn!("Rejected registration of missing path {:?}", path);
            return Err(CatalogError::Validation(format!("path does not exist: {path}")));
        }

        let name = match input.name.trim() {
            "" => Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| CatalogError::Validation("name is required".into()))?,
            name => name.to_string(),
        };
        let tag_names = parse_tag_list(&input.tags);

        let tx = self.store.transaction()?;
        let file_id = store::insert_file(&tx, &name, path, input.memo.as_deref())?;
        tags::relink(&tx, file_id, &tag_names)?;
        tx.commit()?;

        info!("Registered {:?} as file {} with {} tags", path, file_id, tag_names.len());
        Ok(file_id)
    }

    pub fn search(&self, name_filter: &str, tag_filter: &str) -> Result<Vec<FileEntry>> {
        search::search(self.store.connection(), name_filter, tag_filter)
    }

    pub fn get(&self, file_id: i64) -> Result<Option<FileRecord>> {
        self.store.get_file(file_id)
    }

    /// Rewrites name, path, memo and tags of a registered file. The path is
    /// not checked against the filesystem here.
    pub fn update(&mut self, file_id: i64, input: &FileInput) -> Result<()> {
        let name = input.name.trim();
        let path = input.path.trim();
        if name.is_empty() {
            return Err(CatalogError::Validation("name is required".into()));
        }
        if path.is_empty() {
            return Err(CatalogError::Validation("path is required".into()));
        }
        let tag_names = parse_tag_list(&input.tags);

        let tx = self.store.transaction()?;
        if !store::update_file(&tx, file_id, name, path, input.memo.as_deref())? {
            return Err(CatalogError::FileNotFound(file_id));
        }
        tags::relink(&tx, file_id, &tag_names)?;
        tx.commit()?;

        info!("Updated file {}", file_id);
        Ok(())
    }

    /// Like `update`, but memo and tags left as `None` keep their stored values.
    pub fn edit(&mut self, file_id: i64, edit: &FileEdit) -> Result<()> {
        let current = self
            .store
            .get_file(file_id)?
            .ok_or(CatalogError::FileNotFound(file_id))?;
        let tags = match &edit.tags {
            Some(tags) => tags.clone(),
            None => search::tags_for_file(self.store.connection(), file_id)?.join(","),
        };
        let input = FileInput {
            name: edit.name.clone(),
            path: edit.path.clone(),
            memo: edit.memo.clone().or(current.memo),
            tags,
        };
        self.update(file_id, &input)
    }

    /// Replaces only the tags of a registered file.
    pub fn retag(&mut self, file_id: i64, tags_text: &str) -> Result<()> {
        self.store.relink_tags(file_id, &parse_tag_list(tags_text))
    }

    pub fn delete(&mut self, file_id: i64) -> Result<()> {
        self.store.delete_file(file_id)
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<bool> {
        self.store.delete_tag(name)
    }

    pub fn tags(&self) -> Result<Vec<TagUsage>> {
        search::list_tags_with_usage_counts(self.store.connection())
    }

    pub fn tables(&self) -> Result<Vec<TableSummary>> {
        schema_info::list_tables(self.store.connection())
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        schema_info::table_columns(self.store.connection(), table)
    }

    pub fn records(&self, table: &str) -> Result<TableRecords> {
        schema_info::table_records(self.store.connection(), table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> Result<Catalog> {
        Ok(Catalog::new(CatalogStore::open_in_memory()?))
    }

    fn input(path: &Path, tags: &str) -> FileInput {
        FileInput {
            name: String::new(),
            path: path.to_string_lossy().into_owned(),
            memo: None,
            tags: tags.to_string(),
        }
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list(" a, b ,,c ,  "), vec!["a", "b", "c"]);
        assert!(parse_tag_list("").is_empty());
        assert!(parse_tag_list(" , ,").is_empty());
    }

    #[test]
    fn test_register_existing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("photo.jpg");
        fs::write(&path, b"jpeg")?;

        let mut catalog = catalog()?;
        let mut file = input(&path, "photo, misc, photo");
        file.memo = Some("holiday".into());
        let id = catalog.register(&file)?;

        let entries = catalog.search("", "")?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].filename, "photo.jpg");
        assert_eq!(entries[0].tags, "photo,misc");
        assert_eq!(entries[0].memo.as_deref(), Some("holiday"));
        assert!(!entries[0].is_dir());
        Ok(())
    }

    #[test]
    fn test_register_folder_with_explicit_name() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;
        let mut folder = input(dir.path(), "");
        folder.name = "  scratch  ".into();

        let id = catalog.register(&folder)?;

        let entries = catalog.search("scratch", "")?;
        let entry = &entries[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.filename, "scratch");
        assert!(entry.is_dir());
        Ok(())
    }

    #[test]
    fn test_register_missing_path_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;

        let err = catalog.register(&input(&dir.path().join("gone.txt"), "a,b")).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));

        assert!(catalog.search("", "")?.is_empty());
        assert!(catalog.tags()?.is_empty());
        Ok(())
    }

    fn reject_tag(catalog: &Catalog, name: &str) -> Result<()> {
        let sql = format!(
            "CREATE TRIGGER reject_tag BEFORE INSERT ON tag_mng WHEN NEW.tag_name = '{name}'
             BEGIN SELECT RAISE(ABORT, 'tag rejected'); END;"
        );
        catalog.store().connection().execute_batch(&sql)?;
        Ok(())
    }

    fn row_count(catalog: &Catalog, table: &str) -> Result<i64> {
        let records = catalog.records(table)?;
        Ok(records.rows.len() as i64)
    }

    #[test]
    fn test_failed_register_leaves_no_file_row() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;
        reject_tag(&catalog, "bad")?;

        assert!(catalog.register(&input(dir.path(), "fine, bad")).is_err());

        assert_eq!(row_count(&catalog, "files")?, 0);
        assert_eq!(row_count(&catalog, "tag_mng")?, 0);
        assert_eq!(row_count(&catalog, "file_tags")?, 0);
        Ok(())
    }

    #[test]
    fn test_failed_update_keeps_previous_fields() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;
        let id = catalog.register(&input(dir.path(), "kept"))?;
        reject_tag(&catalog, "bad")?;

        let change = FileInput {
            name: "renamed".into(),
            path: "/elsewhere".into(),
            memo: Some("changed".into()),
            tags: "bad".into(),
        };
        assert!(catalog.update(id, &change).is_err());

        let record = catalog.get(id)?.unwrap();
        assert_ne!(record.filename, "renamed");
        assert_eq!(record.memo, None);
        assert_eq!(catalog.search("", "")?[0].tags, "kept");
        Ok(())
    }

    #[test]
    fn test_register_requires_path() -> Result<()> {
        let mut catalog = catalog()?;
        let err = catalog.register(&FileInput::default()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        Ok(())
    }

    #[test]
    fn test_update_rewrites_fields_and_tags() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("draft.md");
        fs::write(&path, "# draft")?;

        let mut catalog = catalog()?;
        let id = catalog.register(&input(&path, "draft, todo"))?;

        // The new path need not exist.
        let moved = FileInput {
            name: "final.md".into(),
            path: "/archive/final.md".into(),
            memo: Some("published".into()),
            tags: "done, draft".into(),
        };
        catalog.update(id, &moved)?;

        let record = catalog.get(id)?.unwrap();
        assert_eq!(record.filename, "final.md");
        assert_eq!(record.filepath, "/archive/final.md");
        assert_eq!(record.memo.as_deref(), Some("published"));
        assert_eq!(catalog.search("", "")?[0].tags, "done,draft");
        Ok(())
    }

    #[test]
    fn test_retag_keeps_file_fields() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;
        let id = catalog.register(&input(dir.path(), "a, b"))?;

        catalog.retag(id, "c,  a ,c")?;

        let entries = catalog.search("", "")?;
        let entry = &entries[0];
        assert_eq!(entry.tag_list(), vec!["c", "a"]);
        assert_eq!(entry.filepath, dir.path().to_string_lossy());
        assert!(matches!(catalog.retag(id + 1, "x"), Err(CatalogError::FileNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_edit_keeps_unspecified_memo_and_tags() -> Result<()> {
        let dir = TempDir::new()?;
        let mut catalog = catalog()?;
        let mut file = input(dir.path(), "one, two, three");
        file.memo = Some("keep me".into());
        let id = catalog.register(&file)?;

        let rename = FileEdit {
            name: "x".into(),
            path: "/q".into(),
            ..FileEdit::default()
        };
        catalog.edit(id, &rename)?;

        let record = catalog.get(id)?.unwrap();
        assert_eq!(record.filename, "x");
        assert_eq!(record.filepath, "/q");
        assert_eq!(record.memo.as_deref(), Some("keep me"));
        assert_eq!(catalog.search("", "")?[0].tags, "one,two,three");

        let clear = FileEdit {
            name: "x".into(),
            path: "/q".into(),
            memo: Some(String::new()),
            tags: Some(String::new()),
        };
        catalog.edit(id, &clear)?;
        assert_eq!(catalog.get(id)?.unwrap().memo.as_deref(), Some(""));
        assert_eq!(catalog.search("", "")?[0].tags, "");

        assert!(matches!(catalog.edit(id + 1, &rename), Err(CatalogError::FileNotFound(_))));
        Ok(())
    }

    #[test]
    fn test_update_unknown_file() -> Result<()> {
        let mut catalog = catalog()?;
        let file = FileInput {
            name: "x".into(),
            path: "/x".into(),
            memo: None,
            tags: "a".into(),
        };
        assert!(matches!(catalog.update(5, &file), Err(CatalogError::FileNotFound(5))));
        assert!(catalog.tags()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_update_requires_name() -> Result<()> {
        let mut catalog = catalog()?;
        let file = FileInput {
            path: "/x".into(),
            ..FileInput::default()
        };
        assert!(matches!(catalog.update(1, &file), Err(CatalogError::Validation(_))));
        Ok(())
    }

    #[test]
    fn test_delete_and_delete_tag() -> Result<()> {
        let dir = TempDir::new()?;
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a")?;
        fs::write(&b, "b")?;

        let mut catalog = catalog()?;
        let id_a = catalog.register(&input(&a, "x, y"))?;
        let id_b = catalog.register(&input(&b, "x"))?;

        assert!(catalog.delete_tag("x")?);
        assert!(!catalog.delete_tag("x")?);
        let entries = catalog.search("", "")?;
        assert!(entries.iter().all(|e| !e.tag_list().contains(&"x")));

        catalog.delete(id_a)?;
        let remaining: Vec<i64> = catalog.search("", "")?.iter().map(|e| e.id).collect();
        assert_eq!(remaining, vec![id_b]);
        Ok(())
    }
}
