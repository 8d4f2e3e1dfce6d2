use crate::core::config::Settings;
use crate::core::download::{Fetcher, Transport};
use crate::core::{archive, install, locate};
use crate::error::{InstallError, Result};
use crate::utils::console::Console;
use std::path::PathBuf;

/// Where each step of a completed run left its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub archive: PathBuf,
    pub staging_dir: PathBuf,
    pub release_dir: PathBuf,
    pub destination: PathBuf,
}

/// Downloads, extracts, locates and installs a Drupal release, stopping at the
/// first step that fails.
pub fn run(
    settings: &Settings,
    transport: &dyn Transport,
    console: &mut dyn Console,
) -> Result<ProvisionReport> {
    settings.validate()?;

    let archive_path = settings.archive_path();
    let fetched = Fetcher::new(transport).fetch(
        &settings.url,
        &archive_path,
        settings.timeout,
        settings.max_attempts,
        console,
    )?;
    if !fetched {
        return Err(InstallError::DownloadFailed {
            url: settings.url.clone(),
            attempts: settings.max_attempts,
        });
    }

    let staging_dir = settings.staging_dir();
    archive::extract(&archive_path, &staging_dir)?;
    console.line(&format!("Drupal extracted to {}", staging_dir.display()));

    let release_dir = locate::locate_by_prefix(&staging_dir, &settings.prefix)?;

    let destination = settings.destination_dir();
    install::install(&release_dir, &destination)?;
    console.line(&format!("Drupal copied to {}", destination.display()));

    Ok(ProvisionReport {
        archive: archive_path,
        staging_dir,
        release_dir,
        destination,
    })
}
