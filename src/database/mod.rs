pub mod info;
pub mod schema;
pub mod search;
pub mod store;
pub mod tags;

pub use search::{FileEntry, TagUsage};
pub use store::{CatalogStore, FileRecord};
