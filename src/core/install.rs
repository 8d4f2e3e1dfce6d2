use crate::error::Result;
use crate::utils::fs::{copy_dir_recursive, remove_dir_recursive};
use std::path::Path;

/// Replaces `destination` with a copy of `source`.
///
/// Any existing `destination` is deleted first and nothing is backed up; an
/// interrupted run can leave it missing or partly copied.
pub fn install(source: &Path, destination: &Path) -> Result<()> {
    remove_dir_recursive(destination)?;
    copy_dir_recursive(source, destination)
}
