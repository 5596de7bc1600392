/// Version written by this build. Bump together with a new entry in `MIGRATIONS`.
pub const CURRENT_VERSION: i64 = 1;

pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        filepath TEXT NOT NULL,
        memo TEXT,
        created_at TIMESTAMP DEFAULT (datetime('now', 'localtime'))
    );

    CREATE TABLE IF NOT EXISTS tag_mng (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag_name TEXT,
        created_at TIMESTAMP DEFAULT (datetime('now', 'localtime')),
        updated_at TIMESTAMP DEFAULT (datetime('now', 'localtime'))
    );

    CREATE TABLE IF NOT EXISTS file_tags (
        file_id INTEGER,
        tag_id INTEGER,
        number_of INTEGER,
        created_at TIMESTAMP DEFAULT (datetime('now', 'localtime')),
        PRIMARY KEY (file_id, tag_id),
        FOREIGN KEY (file_id) REFERENCES files(id),
        FOREIGN KEY (tag_id) REFERENCES tag_mng(id)
    );

    CREATE INDEX IF NOT EXISTS idx_tags_join_file_id ON file_tags(file_id);
    CREATE INDEX IF NOT EXISTS idx_tags_join_tag_id ON file_tags(tag_id);

    CREATE TABLE IF NOT EXISTS version (
        version INTEGER NOT NULL
    );
";

/// `MIGRATIONS[n]` takes a database from version `n` to `n + 1`.
pub const MIGRATIONS: &[&str] = &[
    // v0 -> v1: files gains the memo column.
    "
    CREATE TABLE files_v1 (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        filepath TEXT NOT NULL,
        memo TEXT,
        created_at TIMESTAMP DEFAULT (datetime('now', 'localtime'))
    );
    INSERT INTO files_v1 (id, filename, filepath, memo, created_at)
        SELECT id, filename, filepath, '', created_at FROM files;
    DROP TABLE files;
    ALTER TABLE files_v1 RENAME TO files;
    ",
];

const _: () = assert!(MIGRATIONS.len() as i64 == CURRENT_VERSION);
