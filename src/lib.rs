pub mod catalog;
pub mod database;
pub mod error;
pub mod utils;

pub use catalog::{parse_tag_list, Catalog, FileEdit, FileInput};
pub use error::{CatalogError, Result};
