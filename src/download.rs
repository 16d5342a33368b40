//! Streaming file transfer over HTTP.

use crate::catalog::ContentSource;
use crate::error::DownloadError;
use async_trait::async_trait;
use futures_util::StreamExt;
use md5::{Digest, Md5};
use reqwest::Client;
use std::path::Path;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

/// Content of one drive file, fetched from its download link.
#[derive(Debug, Clone)]
pub(crate) struct HttpContent {
    http: Client,
    url: String,
    expected_size: u64,
    md5_checksum: Option<String>,
}

impl HttpContent {
    pub(crate) fn new(
        http: Client,
        url: String,
        expected_size: u64,
        md5_checksum: Option<String>,
    ) -> Self {
        Self {
            http,
            url,
            expected_size,
            md5_checksum,
        }
    }
}

#[async_trait]
impl ContentSource for HttpContent {
    /// Streams the link's body into `local_path`, truncating it first.
    ///
    /// The written length must equal the size the drive reported, and when
    /// the drive supplied an MD5 checksum the streamed bytes must hash to it.
    async fn transfer(&self, local_path: &Path) -> Result<u64, DownloadError> {
        let response = self.http.get(&self.url).send().await?.error_for_status()?;
        debug!("Streaming {} to {}", self.url, local_path.display());

        let mut file = BufWriter::new(tokio::fs::File::create(local_path).await?);
        let mut hasher = self.md5_checksum.as_ref().map(|_| Md5::new());
        let mut written = 0u64;

        let mut byte_stream = response.bytes_stream();
        while let Some(piece) = byte_stream.next().await {
            let chunk = piece?;
            if let Some(ref mut h) = hasher {
                h.update(&chunk);
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written != self.expected_size {
            return Err(DownloadError::SizeMismatch {
                path: local_path.to_path_buf(),
                expected: self.expected_size,
                actual: written,
            });
        }

        if let (Some(expected), Some(hasher)) = (&self.md5_checksum, hasher) {
            let computed = format!("{:x}", hasher.finalize());
            if !computed.eq_ignore_ascii_case(expected) {
                return Err(DownloadError::ChecksumMismatch {
                    path: local_path.to_path_buf(),
                    expected: expected.clone(),
                    actual: computed,
                });
            }
            let display_name = local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!("MD5 verified for {}", display_name);
        }

        Ok(written)
    }
}
