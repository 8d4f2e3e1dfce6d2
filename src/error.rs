use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InstallError>;

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download timed out: {url}")]
    DownloadTimeout { url: String },

    #[error(
        "Failed to download {url} after {attempts} attempts. Please check your internet connection and try again."
    )]
    DownloadFailed { url: String, attempts: u32 },

    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error while downloading {url}: {message}")]
    Network { url: String, message: String },

    #[error(
        "Permission denied: {path}. Please run the installer with administrator privileges."
    )]
    PermissionDenied { path: PathBuf },

    #[error("Extraction failed: {path}: {source}")]
    ExtractionError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No directory starting with '{prefix}' found under {root}")]
    DirectoryNotFound { prefix: String, root: PathBuf },

    #[error("Unsupported archive format: {path}")]
    UnsupportedArchive { path: PathBuf },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl InstallError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        InstallError::ConfigError {
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, InstallError::DownloadTimeout { .. })
    }
}
