use crate::error::{InstallError, Result};
use std::fs::DirEntry;
use std::path::{Path, PathBuf};

/// Finds the first directory under `root` whose name starts with `prefix`.
///
/// The walk is top-down: all subdirectories of a directory are checked before
/// any of them is descended into, and siblings are visited in `read_dir`
/// order. That order comes from the file system, so when several directories
/// match, which one wins is not guaranteed to be stable.
pub fn locate_by_prefix(root: &Path, prefix: &str) -> Result<PathBuf> {
    let not_found = || InstallError::DirectoryNotFound {
        prefix: prefix.to_string(),
        root: root.to_path_buf(),
    };

    if !root.is_dir() {
        return Err(not_found());
    }

    search(root, prefix)?.ok_or_else(not_found)
}

fn search(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let subdirs = subdirectories(dir)?;

    if let Some(hit) = subdirs.iter().find(|entry| name_matches(entry, prefix)) {
        return Ok(Some(hit.path()));
    }

    for entry in &subdirs {
        if let Some(found) = search(&entry.path(), prefix)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

// Symlinked directories are listed but never followed.
fn subdirectories(dir: &Path) -> Result<Vec<DirEntry>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry);
        }
    }
    Ok(subdirs)
}

fn name_matches(entry: &DirEntry, prefix: &str) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(prefix))
}
