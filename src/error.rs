use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("file {0} is not registered")]
    FileNotFound(i64),

    #[error("table '{0}' does not exist in the catalog schema")]
    UnknownTable(String),

    #[error("database schema version {stored} is newer than supported version {supported}")]
    UnsupportedVersion { stored: i64, supported: i64 },

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
