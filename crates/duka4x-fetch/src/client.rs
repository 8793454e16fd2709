//! Retryable HTTP fetcher: GET a URL, stream the body to a temp file, then
//! atomically rename it into place.

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Maximum number of attempts per [`FetchClient::fetch`] call.
const MAX_ATTEMPTS: u32 = 5;

/// Fixed backoff between retry attempts.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Errors that can occur while fetching a URL to a destination file.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client itself failed (transport error, non-2xx/404 status
    /// after exhausting all retries).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the response body, or the final rename, failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server returned a status other than 2xx or 404 on every attempt.
    #[error("server returned status {status} after {attempts} attempts")]
    ServerError {
        /// Final HTTP status code observed.
        status: u16,
        /// Number of attempts made.
        attempts: u32,
    },
}

/// Outcome of a successful [`FetchClient::fetch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    /// HTTP status code of the terminating attempt (200 or 404).
    pub status: u16,
    /// Number of bytes written to `dest_path`. Zero for a 404 or an empty body.
    pub bytes_written: u64,
}

impl FetchOutcome {
    /// Returns true if the vendor returned HTTP 404 for this URL.
    #[must_use]
    pub const fn not_found(&self) -> bool {
        self.status == 404
    }
}

/// Retryable HTTP fetcher used by the hour cache.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
}

impl FetchClient {
    /// Creates a new fetcher with the package's user agent and a 5-minute
    /// per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("duka4x/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url`, writing its body to `dest_path` on success.
    ///
    /// Up to 5 attempts: a transport error or a non-2xx/non-404 status
    /// waits 5 seconds and retries. A 404 returns immediately with
    /// `status: 404, bytes_written: 0` — it is not an error. On 200, the
    /// body streams into a uniquely named temp file in the OS temp dir,
    /// which is then renamed atomically into `dest_path` (parent
    /// directories are created first). If anything after the body write
    /// fails, the temp file is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt fails, or if the local file I/O
    /// (directory creation, write, rename) fails.
    pub async fn fetch(&self, url: &str, dest_path: &Path) -> Result<FetchOutcome, FetchError> {
        let mut last_status = 0u16;
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(FetchOutcome {
                            status: 404,
                            bytes_written: 0,
                        });
                    }
                    if status.is_success() {
                        let bytes_written = Self::stream_to_dest(response, dest_path).await?;
                        return Ok(FetchOutcome {
                            status: status.as_u16(),
                            bytes_written,
                        });
                    }
                    last_status = status.as_u16();
                    last_err = None;
                }
                Err(e) => last_err = Some(e),
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        match last_err {
            Some(e) => Err(FetchError::Http(e)),
            None => Err(FetchError::ServerError {
                status: last_status,
                attempts: MAX_ATTEMPTS,
            }),
        }
    }

    /// Streams a 200 response body into a temp file, then renames it into
    /// place. Removes the temp file if anything fails along the way.
    async fn stream_to_dest(
        response: reqwest::Response,
        dest_path: &Path,
    ) -> Result<u64, FetchError> {
        let named = tempfile::Builder::new()
            .prefix("duka4x-")
            .suffix(".tmp")
            .tempfile()?;
        let (std_file, tmp_path) = named.keep().map_err(|e| e.error)?;
        let mut out = tokio::fs::File::from_std(std_file);

        let write_result = Self::write_body(&mut out, response).await;

        match write_result {
            Ok(bytes_written) => {
                if let Some(parent) = dest_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                if let Err(e) = tokio::fs::rename(&tmp_path, dest_path).await {
                    let _ = tokio::fs::remove_file(&tmp_path).await;
                    return Err(e.into());
                }
                Ok(bytes_written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                Err(e)
            }
        }
    }

    async fn write_body(
        out: &mut tokio::fs::File,
        response: reqwest::Response,
    ) -> Result<u64, FetchError> {
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }
}
