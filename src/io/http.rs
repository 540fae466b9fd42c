use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::ReadAt;

const DEFAULT_MAX_RETRY: u32 = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP Range reader for remote ZIP files.
///
/// Every positional read becomes one `Range: bytes=a-b` request, so listing
/// an archive only transfers its tail and central directory.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader.
    ///
    /// Sends a HEAD request to verify Range support and learn the size.
    pub async fn new(url: String) -> io::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(io::Error::other)?;

        let resp = client.head(&url).send().await.map_err(io::Error::other)?;
        if !resp.status().is_success() {
            return Err(io::Error::other(format!(
                "HEAD {url} failed with status {}",
                resp.status()
            )));
        }

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        if !header("accept-ranges").is_some_and(|v| v.contains("bytes")) {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "remote server does not support Range requests",
            ));
        }

        let size = header("content-length")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| io::Error::other("remote server did not return Content-Length"))?;

        debug!(%url, size, "opened remote archive");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: DEFAULT_MAX_RETRY,
        })
    }

    /// Override how many times a timed-out or refused request is retried.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.max(1);
        self
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// Fetch one inclusive byte range into `dst`, retrying on transient failures.
    ///
    /// Returns how many bytes the server sent, capped at `dst.len()`.
    async fn fetch_range(&self, start: u64, end: u64, dst: &mut [u8]) -> io::Result<usize> {
        let range = format!("bytes={start}-{end}");
        let mut attempt = 0;

        loop {
            match self
                .client
                .get(&self.url)
                .header("Range", &range)
                .send()
                .await
            {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    let body = resp.bytes().await.map_err(io::Error::other)?;
                    let n = body.len().min(dst.len());
                    dst[..n].copy_from_slice(&body[..n]);
                    return Ok(n);
                }
                Ok(resp) => {
                    return Err(io::Error::other(format!(
                        "range request {range} failed with status {}",
                        resp.status()
                    )));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    if attempt >= self.max_retry {
                        return Err(io::Error::new(io::ErrorKind::TimedOut, e));
                    }
                    warn!(attempt, max = self.max_retry, error = %e, "range request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                Err(e) => return Err(io::Error::other(e)),
            }
        }
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64 - 1).min(self.size - 1);
        let expected = (end - offset + 1) as usize;

        let mut received = 0;
        while received < expected {
            let n = self
                .fetch_range(offset + received as u64, end, &mut buf[received..expected])
                .await?;
            if n == 0 {
                break;
            }
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
