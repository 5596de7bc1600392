use std::path::{Path, PathBuf};

use crate::utils::config::FileOpenMode;

/// Paths to hand to the platform opener for a catalog entry.
///
/// A folder entry always opens the folder itself. For a file, `mode`
/// picks between its containing folder, the file, or both (file first).
pub fn open_targets(path: &Path, mode: FileOpenMode) -> Vec<PathBuf> {
    if path.is_dir() {
        return vec![path.to_path_buf()];
    }

    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    match mode {
        FileOpenMode::None => vec![folder],
        FileOpenMode::Only => vec![path.to_path_buf()],
        FileOpenMode::Both => vec![path.to_path_buf(), folder],
    }
}
