use crate::error::{InstallError, Result};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DIR_PREFIX: &str = "drupal-";
pub const DEFAULT_SITE_NAME: &str = "drupal";
const STAGING_DIR_NAME: &str = "drupal-extracted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn default_url(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "https://www.drupal.org/download-latest/tar.gz",
            ArchiveFormat::Zip => "https://www.drupal.org/download-latest/zip",
        }
    }

    pub fn archive_file_name(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "drupal.tar.gz",
            ArchiveFormat::Zip => "drupal.zip",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub url: String,
    pub format: ArchiveFormat,
    pub download_dir: PathBuf,
    pub docroot: PathBuf,
    pub site_name: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub prefix: String,
}

impl Settings {
    /// Settings with every value at its default except the two directories,
    /// which have no sensible platform-independent default.
    pub fn new(download_dir: PathBuf, docroot: PathBuf) -> Self {
        let format = ArchiveFormat::default();
        Settings {
            url: format.default_url().to_string(),
            format,
            download_dir,
            docroot,
            site_name: DEFAULT_SITE_NAME.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            prefix: DEFAULT_DIR_PREFIX.to_string(),
        }
    }

    pub fn archive_path(&self) -> PathBuf {
        self.download_dir.join(self.format.archive_file_name())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.download_dir.join(STAGING_DIR_NAME)
    }

    pub fn destination_dir(&self) -> PathBuf {
        self.docroot.join(&self.site_name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(InstallError::config_error("download URL must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(InstallError::config_error("timeout must be greater than zero"));
        }
        if self.max_attempts == 0 {
            return Err(InstallError::config_error("retries must be at least 1"));
        }
        if self.prefix.is_empty() {
            return Err(InstallError::config_error("directory prefix must not be empty"));
        }

        let mut components = Path::new(&self.site_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => {
                return Err(InstallError::config_error(format!(
                    "site name '{}' must be a single directory name",
                    self.site_name
                )))
            }
        }

        Ok(())
    }
}

/// The user's downloads folder, falling back to `~/Downloads`.
pub fn default_download_dir() -> Result<PathBuf> {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .ok_or_else(|| {
            InstallError::config_error(
                "could not determine a downloads directory; pass --download-dir",
            )
        })
}
