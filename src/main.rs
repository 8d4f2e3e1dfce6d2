use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use drupal_install::commands::provision;
use drupal_install::core::config::{self, ArchiveFormat, Settings};
use drupal_install::core::download::HttpTransport;
use drupal_install::utils::console::Stdout;

#[derive(Parser)]
#[clap(name = "drupal-install")]
#[clap(about = "Download the latest Drupal release and install it into a web server document root")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Web server document root to install into (e.g. /var/www/html or C:\xampp\htdocs)
    #[clap(long, env = "DRUPAL_DOCROOT")]
    docroot: PathBuf,

    /// Name of the directory created under the document root
    #[clap(long, env = "DRUPAL_SITE_NAME", default_value = config::DEFAULT_SITE_NAME)]
    site_name: String,

    /// Archive URL (defaults to the latest release for --format)
    #[clap(long, env = "DRUPAL_URL")]
    url: Option<String>,

    /// Archive format to download
    #[clap(long, env = "DRUPAL_ARCHIVE_FORMAT", value_enum, default_value_t = ArchiveFormat::TarGz)]
    format: ArchiveFormat,

    /// Directory for the downloaded archive and the extracted files (default: your Downloads folder)
    #[clap(long, env = "DRUPAL_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Seconds before a download attempt is abandoned
    #[clap(long, env = "DRUPAL_TIMEOUT", default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Number of download attempts before giving up
    #[clap(long, env = "DRUPAL_RETRIES", default_value_t = config::DEFAULT_MAX_ATTEMPTS)]
    retries: u32,

    /// Name prefix of the release directory inside the archive
    #[clap(long, env = "DRUPAL_DIR_PREFIX", default_value = config::DEFAULT_DIR_PREFIX)]
    prefix: String,
}

impl Cli {
    fn into_settings(self) -> drupal_install::error::Result<Settings> {
        let download_dir = match self.download_dir {
            Some(dir) => dir,
            None => config::default_download_dir()?,
        };

        let mut settings = Settings::new(download_dir, self.docroot);
        settings.url = self
            .url
            .unwrap_or_else(|| self.format.default_url().to_string());
        settings.format = self.format;
        settings.site_name = self.site_name;
        settings.timeout = Duration::from_secs(self.timeout);
        settings.max_attempts = self.retries;
        settings.prefix = self.prefix;
        Ok(settings)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = cli
        .into_settings()
        .and_then(|settings| provision::run(&settings, &HttpTransport::new(), &mut Stdout));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
