use crate::error::{InstallError, Result};
use crate::utils::console::Console;
use crate::utils::fs::{ensure_dir_exists, map_permission};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

const USER_AGENT: &str = concat!("drupal-install/", env!("CARGO_PKG_VERSION"));

/// Opens a streaming body for a URL.
///
/// Implementations report a request that ran past `timeout` as
/// [`InstallError::DownloadTimeout`] so the fetch loop can retry it; any other
/// error ends the download.
pub trait Transport {
    fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn Read + Send>>;
}

/// HTTP(S) transport backed by `ureq`. Redirects are followed and `timeout`
/// bounds the whole request, body included.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    user_agent: String,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        HttpTransport {
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str, timeout: Duration) -> Result<Box<dyn Read + Send>> {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(&self.user_agent)
            .build();

        match agent.get(url).call() {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(status, _)) => Err(InstallError::HttpStatus {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => {
                if is_timeout_transport(&transport) {
                    Err(InstallError::DownloadTimeout {
                        url: url.to_string(),
                    })
                } else {
                    Err(InstallError::Network {
                        url: url.to_string(),
                        message: transport.to_string(),
                    })
                }
            }
        }
    }
}

fn is_timeout_transport(transport: &ureq::Transport) -> bool {
    use std::error::Error as _;

    transport
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .is_some_and(is_timeout_io)
}

fn is_timeout_io(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Downloads a file, retrying only attempts that time out.
pub struct Fetcher<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Fetcher<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Fetcher { transport }
    }

    /// Makes up to `max_attempts` attempts to save `url` at `destination`.
    ///
    /// Returns `Ok(true)` as soon as one attempt completes and `Ok(false)` once
    /// every attempt has timed out. Other failures are returned as errors
    /// without retrying. Each attempt writes a fresh `<destination>.part`
    /// that is renamed into place only when complete.
    pub fn fetch(
        &self,
        url: &str,
        destination: &Path,
        timeout: Duration,
        max_attempts: u32,
        console: &mut dyn Console,
    ) -> Result<bool> {
        if let Some(parent) = destination.parent() {
            ensure_dir_exists(parent)?;
        }

        let part = part_path(destination);

        for attempt in 1..=max_attempts {
            match self.attempt(url, &part, timeout) {
                Ok(()) => {
                    std::fs::rename(&part, destination)
                        .map_err(|e| map_permission(e, destination))?;
                    console.line(&format!("Drupal downloaded to {}", destination.display()));
                    return Ok(true);
                }
                Err(e) if e.is_timeout() => {
                    discard_part(&part, console);
                    console.line(&format!("Attempt {attempt} of {max_attempts} timed out."));
                }
                Err(e) => {
                    discard_part(&part, console);
                    return Err(e);
                }
            }
        }

        console.line(&format!(
            "Failed to download Drupal after {max_attempts} attempts."
        ));
        Ok(false)
    }

    fn attempt(&self, url: &str, part: &Path, timeout: Duration) -> Result<()> {
        let mut body = self.transport.open(url, timeout)?;
        let mut file = File::create(part).map_err(|e| map_permission(e, part))?;

        io::copy(&mut body, &mut file).map_err(|e| {
            if is_timeout_io(&e) {
                InstallError::DownloadTimeout {
                    url: url.to_string(),
                }
            } else {
                InstallError::from(e)
            }
        })?;

        file.sync_all()?;
        Ok(())
    }
}

// A part file that was never created is fine; anything else is reported.
fn discard_part(part: &Path, console: &mut dyn Console) {
    match std::fs::remove_file(part) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => console.line(&format!(
            "Warning: could not remove partial download {}: {e}",
            part.display()
        )),
    }
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::console::Transcript;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::io::{Cursor, Write};
    use std::net::{TcpListener, TcpStream};
    use tempfile::TempDir;

    const URL: &str = "https://www.drupal.org/download-latest/tar.gz";
    const TIMEOUT: Duration = Duration::from_secs(5);

    enum Step {
        Timeout,
        StallMidBody(&'static [u8]),
        Body(&'static [u8]),
        Status(u16),
    }

    struct ScriptedTransport {
        steps: RefCell<VecDeque<Step>>,
        calls: Cell<u32>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            ScriptedTransport {
                steps: RefCell::new(steps.into()),
                calls: Cell::new(0),
            }
        }
    }

    /// Yields some bytes, then fails the way a stalled socket read does.
    struct StallingReader {
        head: Cursor<&'static [u8]>,
    }

    impl Read for StallingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.head.read(buf)?;
            if n > 0 {
                return Ok(n);
            }
            Err(io::Error::new(io::ErrorKind::TimedOut, "stalled"))
        }
    }

    impl Transport for ScriptedTransport {
        fn open(&self, url: &str, _timeout: Duration) -> Result<Box<dyn Read + Send>> {
            self.calls.set(self.calls.get() + 1);
            match self.steps.borrow_mut().pop_front() {
                Some(Step::Timeout) | None => Err(InstallError::DownloadTimeout {
                    url: url.to_string(),
                }),
                Some(Step::StallMidBody(head)) => Ok(Box::new(StallingReader {
                    head: Cursor::new(head),
                })),
                Some(Step::Body(body)) => Ok(Box::new(Cursor::new(body))),
                Some(Step::Status(status)) => Err(InstallError::HttpStatus {
                    url: url.to_string(),
                    status,
                }),
            }
        }
    }

    fn retry_lines(transcript: &Transcript) -> usize {
        transcript
            .lines
            .iter()
            .filter(|line| line.starts_with("Attempt "))
            .count()
    }

    #[test]
    fn test_all_attempts_time_out() {
        for max_attempts in 1..=4 {
            let temp = TempDir::new().unwrap();
            let destination = temp.path().join("drupal.tar.gz");
            let transport = ScriptedTransport::new(Vec::new());
            let mut transcript = Transcript::new();

            let fetched = Fetcher::new(&transport)
                .fetch(URL, &destination, TIMEOUT, max_attempts, &mut transcript)
                .unwrap();

            assert!(!fetched);
            assert_eq!(transport.calls.get(), max_attempts);
            assert_eq!(retry_lines(&transcript), max_attempts as usize);
            assert_eq!(
                transcript.lines.first().map(String::as_str),
                Some(format!("Attempt 1 of {max_attempts} timed out.").as_str())
            );
            assert!(!destination.exists());
            assert!(!part_path(&destination).exists());
        }
    }

    #[test]
    fn test_stops_after_first_success() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("drupal.tar.gz");
        let transport = ScriptedTransport::new(vec![
            Step::Timeout,
            Step::Body(b"archive-bytes"),
            Step::Body(b"never-requested"),
        ]);
        let mut transcript = Transcript::new();

        let fetched = Fetcher::new(&transport)
            .fetch(URL, &destination, TIMEOUT, 3, &mut transcript)
            .unwrap();

        assert!(fetched);
        assert_eq!(transport.calls.get(), 2);
        assert_eq!(std::fs::read(&destination).unwrap(), b"archive-bytes");
        assert!(!part_path(&destination).exists());
        assert_eq!(
            transcript.lines,
            vec![
                "Attempt 1 of 3 timed out.".to_string(),
                format!("Drupal downloaded to {}", destination.display()),
            ]
        );
    }

    #[test]
    fn test_timeout_while_streaming_discards_partial_bytes() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("drupal.tar.gz");
        let transport = ScriptedTransport::new(vec![
            Step::StallMidBody(b"partial-partial-partial"),
            Step::Body(b"full"),
        ]);
        let mut transcript = Transcript::new();

        let fetched = Fetcher::new(&transport)
            .fetch(URL, &destination, TIMEOUT, 3, &mut transcript)
            .unwrap();

        assert!(fetched);
        assert_eq!(std::fs::read(&destination).unwrap(), b"full");
        assert_eq!(retry_lines(&transcript), 1);
    }

    #[test]
    fn test_http_error_is_not_retried() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("drupal.tar.gz");
        let transport = ScriptedTransport::new(vec![Step::Status(503), Step::Body(b"ok")]);
        let mut transcript = Transcript::new();

        let result = Fetcher::new(&transport).fetch(URL, &destination, TIMEOUT, 3, &mut transcript);

        assert!(matches!(
            result,
            Err(InstallError::HttpStatus { status: 503, .. })
        ));
        assert_eq!(transport.calls.get(), 1);
        assert!(transcript.lines.is_empty());
    }

    #[test]
    fn test_overwrites_existing_destination() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("nested/drupal.tar.gz");
        std::fs::create_dir_all(destination.parent().unwrap()).unwrap();
        std::fs::write(&destination, b"stale archive from an older run").unwrap();
        let transport = ScriptedTransport::new(vec![Step::Body(b"fresh")]);

        let fetched = Fetcher::new(&transport)
            .fetch(URL, &destination, TIMEOUT, 1, &mut Transcript::new())
            .unwrap();

        assert!(fetched);
        assert_eq!(std::fs::read(&destination).unwrap(), b"fresh");
    }

    #[test]
    fn test_discard_part_is_quiet_for_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut transcript = Transcript::new();

        discard_part(&temp.path().join("drupal.tar.gz.part"), &mut transcript);

        assert!(transcript.lines.is_empty());
    }

    #[test]
    fn test_discard_part_reports_failed_removal() {
        let temp = TempDir::new().unwrap();
        // A directory in place of the part file cannot be removed with remove_file.
        let part = temp.path().join("drupal.tar.gz.part");
        std::fs::create_dir(&part).unwrap();
        let mut transcript = Transcript::new();

        discard_part(&part, &mut transcript);

        assert_eq!(transcript.lines.len(), 1);
        assert!(transcript.lines[0].starts_with("Warning: could not remove partial download"));
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/drupal.tar.gz")),
            PathBuf::from("/tmp/drupal.tar.gz.part")
        );
    }

    fn read_request(stream: &mut TcpStream) {
        let mut seen = Vec::new();
        let mut buf = [0u8; 1024];
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Serves every connection with `handler` on a loopback port.
    fn serve(handler: fn(TcpStream)) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                std::thread::spawn(move || handler(stream));
            }
        });
        format!("http://{addr}/download-latest/tar.gz")
    }

    #[test]
    fn test_http_transport_downloads_body() {
        let url = serve(|mut stream| {
            read_request(&mut stream);
            let body = b"tarball";
            let _ = write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(body);
        });
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("drupal.tar.gz");
        let transport = HttpTransport::new();

        let fetched = Fetcher::new(&transport)
            .fetch(&url, &destination, TIMEOUT, 3, &mut Transcript::new())
            .unwrap();

        assert!(fetched);
        assert_eq!(std::fs::read(&destination).unwrap(), b"tarball");
    }

    #[test]
    fn test_http_transport_reports_status() {
        let url = serve(|mut stream| {
            read_request(&mut stream);
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        });

        let result = HttpTransport::new().open(&url, TIMEOUT);

        assert!(matches!(
            result,
            Err(InstallError::HttpStatus { status: 404, .. })
        ));
    }

    #[test]
    fn test_http_transport_times_out_and_retries() {
        let url = serve(|mut stream| {
            read_request(&mut stream);
            std::thread::sleep(Duration::from_secs(3));
        });
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("drupal.tar.gz");
        let transport = HttpTransport::new();
        let mut transcript = Transcript::new();

        let fetched = Fetcher::new(&transport)
            .fetch(
                &url,
                &destination,
                Duration::from_millis(200),
                2,
                &mut transcript,
            )
            .unwrap();

        assert!(!fetched);
        assert_eq!(retry_lines(&transcript), 2);
    }

    #[test]
    fn test_http_transport_connection_refused_is_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = HttpTransport::new().open(&format!("http://{addr}/"), TIMEOUT);

        assert!(matches!(result, Err(InstallError::Network { .. })));
    }
}
