//! Streaming archive downloads.

use reqwest::Url;
use reqwest::blocking::Client;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DownloadConfig;
use crate::{Error, Result};

/// Blocking HTTP downloader that streams response bodies to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Build a downloader from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the HTTP client cannot be built
    /// (typically no TLS crypto provider installed).
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        install_crypto_provider();

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download `url` into the file `dest`, returning the number of bytes written.
    ///
    /// `file://` URLs are copied from the local filesystem.
    ///
    /// # Errors
    ///
    /// [`Error::Download`] on transport failure, [`Error::HttpStatus`] on a
    /// non-success response, [`Error::Io`] when `dest` cannot be written.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let parsed =
            Url::parse(url).map_err(|e| Error::configuration(format!("Invalid URL '{url}': {e}")))?;

        info!(%url, ?dest, "Downloading");

        let bytes = match parsed.scheme() {
            "http" | "https" => self.download_http(url, dest)?,
            "file" => copy_local(&parsed, dest)?,
            other => {
                return Err(Error::download(
                    url,
                    format!("unsupported URL scheme '{other}'"),
                ));
            }
        };

        debug!(%url, bytes, "Download complete");
        Ok(bytes)
    }

    fn download_http(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::download(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let file = File::create(dest).map_err(|e| Error::io(e, dest, "create"))?;
        let mut writer = BufWriter::new(file);
        let written = response
            .copy_to(&mut writer)
            .map_err(|e| Error::download(url, e))?;
        writer.flush().map_err(|e| Error::io(e, dest, "write"))?;

        Ok(written)
    }
}

/// Install the ring provider as the process-wide rustls default.
///
/// reqwest is built without a bundled provider; a second call is a no-op.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn copy_local(url: &Url, dest: &Path) -> Result<u64> {
    let source = url
        .to_file_path()
        .map_err(|()| Error::download(url.as_str(), "not a local file path"))?;

    std::fs::copy(&source, dest).map_err(|e| Error::download(url.as_str(), e))
}
