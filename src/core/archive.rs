use crate::core::config::ArchiveFormat;
use crate::error::{InstallError, Result};
use crate::utils::fs::ensure_dir_exists;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::Path;
use tar::Archive;
use zip::result::ZipError;
use zip::ZipArchive;

/// Picks the archive format from the file name.
pub fn detect_format(archive_path: &Path) -> Option<ArchiveFormat> {
    let file_name = archive_path.file_name()?.to_str()?.to_lowercase();

    if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
        Some(ArchiveFormat::TarGz)
    } else if file_name.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Unpacks `archive_path` into `target`, creating `target` if needed.
///
/// Entries keep their relative paths. A permission failure anywhere in the
/// unpack becomes [`InstallError::PermissionDenied`]; any other failure is an
/// [`InstallError::ExtractionError`] wrapping the underlying IO error.
pub fn extract(archive_path: &Path, target: &Path) -> Result<()> {
    ensure_dir_exists(target)?;

    let format = detect_format(archive_path).ok_or_else(|| InstallError::UnsupportedArchive {
        path: archive_path.to_path_buf(),
    })?;

    let unpacked = match format {
        ArchiveFormat::TarGz => unpack_tar_gz(archive_path, target),
        ArchiveFormat::Zip => unpack_zip(archive_path, target),
    };

    unpacked.map_err(|source| classify(source, archive_path, target))
}

fn classify(source: io::Error, archive_path: &Path, target: &Path) -> InstallError {
    match source.kind() {
        io::ErrorKind::PermissionDenied => InstallError::PermissionDenied {
            path: target.to_path_buf(),
        },
        _ => InstallError::ExtractionError {
            path: archive_path.to_path_buf(),
            source,
        },
    }
}

fn unpack_tar_gz(archive_path: &Path, target: &Path) -> io::Result<()> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.unpack(target)
}

fn unpack_zip(archive_path: &Path, target: &Path) -> io::Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(zip_to_io)?;
    // Directory modes are applied last so read-only dirs still receive their files.
    #[cfg(unix)]
    let mut dir_modes = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_to_io)?;
        let outpath = match entry.enclosed_name() {
            Some(path) => target.join(path),
            None => continue,
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                if entry.is_dir() {
                    dir_modes.push((outpath, mode));
                } else {
                    std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Deepest first.
        dir_modes.sort_by_key(|(path, _)| std::cmp::Reverse(path.components().count()));
        for (path, mode) in dir_modes {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}

fn zip_to_io(error: ZipError) -> io::Error {
    match error {
        ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
