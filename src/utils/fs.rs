use crate::error::{InstallError, Result};
use std::io;
use std::path::Path;

/// Turns a permission failure on `path` into `PermissionDenied`, leaving every
/// other error kind as plain IO.
pub fn map_permission(error: io::Error, path: &Path) -> InstallError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => InstallError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => InstallError::from(error),
    }
}

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| map_permission(e, path))?;
    }
    Ok(())
}

pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        std::fs::remove_dir_all(path).map_err(|e| map_permission(e, path))?;
    }
    Ok(())
}

/// Copies `src` into `dst`, recreating symbolic links instead of following them.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    ensure_dir_exists(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path).map_err(|e| map_permission(e, &dst_path))?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = std::fs::read_link(src)?;
    std::os::unix::fs::symlink(&target, dst).map_err(|e| map_permission(e, dst))?;
    Ok(())
}

#[cfg(windows)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = std::fs::read_link(src)?;
    let result = if src.is_dir() {
        std::os::windows::fs::symlink_dir(&target, dst)
    } else {
        std::os::windows::fs::symlink_file(&target, dst)
    };
    result.map_err(|e| map_permission(e, dst))?;
    Ok(())
}
