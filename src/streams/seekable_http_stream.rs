use super::seekable_stream::{check_range, SeekableStream};
use crate::errors::{DurationError, MediaResult, StreamError};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{
    header::{CONTENT_LENGTH, RANGE},
    Client,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// HTTP resource read through `Range` requests.
///
/// Small reads go through a single-block cache so that consecutive box
/// headers cost one request instead of one each.
pub struct SeekableHttpStream {
    url: String,
    client: Client,
    length: u64,
    cache: Mutex<BlockCache>,
    http_request_count: AtomicU64,
    http_request_bytes_read: AtomicU64,
}

struct BlockCache {
    data: Vec<u8>,
    position: u64,
}

impl BlockCache {
    fn get(&self, offset: u64, length: usize) -> Option<Vec<u8>> {
        if offset < self.position {
            return None;
        }
        let start = (offset - self.position) as usize;
        let end = start.checked_add(length)?;
        if end > self.data.len() {
            return None;
        }
        Some(self.data[start..end].to_vec())
    }
}

impl SeekableHttpStream {
    const CACHE_SIZE: usize = 4096;

    pub async fn new(url: String) -> MediaResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StreamError::new(e.to_string()))?;

        let stream = Self {
            url,
            client,
            length: 0,
            cache: Mutex::new(BlockCache {
                data: Vec::new(),
                position: 0,
            }),
            http_request_count: AtomicU64::new(0),
            http_request_bytes_read: AtomicU64::new(0),
        };

        let length = stream.get_content_length().await?;
        Ok(Self { length, ..stream })
    }

    /// Requests issued so far, HEAD included.
    pub fn http_request_count(&self) -> u64 {
        self.http_request_count.load(Ordering::Relaxed)
    }

    /// Body bytes received so far.
    pub fn http_request_bytes_read(&self) -> u64 {
        self.http_request_bytes_read.load(Ordering::Relaxed)
    }

    /// Log how much of the resource was fetched.
    pub fn print_stats(&self) {
        let bytes = self.http_request_bytes_read();
        let share = if self.length > 0 {
            bytes as f64 / self.length as f64 * 100.0
        } else {
            0.0
        };
        info!(
            "📥 {}: {} requests, {} bytes ({:.2}% of {})",
            self.url,
            self.http_request_count(),
            bytes,
            share,
            self.length
        );
    }

    async fn get_content_length(&self) -> MediaResult<u64> {
        let response = self
            .client
            .head(&self.url)
            .send()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        self.http_request_count.fetch_add(1, Ordering::Relaxed);

        if !response.status().is_success() {
            return Err(DurationError::Stream(StreamError::new(format!(
                "HTTP error: {}",
                response.status()
            ))));
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| {
                DurationError::Stream(StreamError::new(
                    "Content-Length header not found or invalid",
                ))
            })
    }

    async fn get_byte_range(&self, offset: u64, count: usize) -> MediaResult<Vec<u8>> {
        let effective_count = (count as u64).min(self.length.saturating_sub(offset)) as usize;
        if effective_count == 0 {
            return Ok(Vec::new());
        }

        let range_to = offset + effective_count as u64 - 1;
        let range_header = format!("bytes={}-{}", offset, range_to);
        debug!("GET {} {}", self.url, range_header);

        let response = self
            .client
            .get(&self.url)
            .header(RANGE, range_header)
            .send()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        self.http_request_count.fetch_add(1, Ordering::Relaxed);

        if response.status().as_u16() == 416 {
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            return Err(DurationError::Stream(StreamError::new(format!(
                "HTTP error: {}",
                response.status()
            ))));
        }

        // A server that ignores Range answers 200 with the whole body.
        let whole_body = response.status().as_u16() == 200;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StreamError::new(e.to_string()))?;

        let start = if whole_body {
            (offset as usize).min(bytes.len())
        } else {
            0
        };
        let end = (start + effective_count).min(bytes.len());
        self.http_request_bytes_read
            .fetch_add((end - start) as u64, Ordering::Relaxed);

        Ok(bytes[start..end].to_vec())
    }
}

#[async_trait]
impl SeekableStream for SeekableHttpStream {
    fn len(&self) -> u64 {
        self.length
    }

    fn location(&self) -> Option<&str> {
        Some(&self.url)
    }

    async fn read_range(&self, offset: u64, length: usize) -> MediaResult<Vec<u8>> {
        check_range(self.length, offset, length)?;

        if length <= Self::CACHE_SIZE {
            let mut cache = self.cache.lock().await;
            if let Some(hit) = cache.get(offset, length) {
                return Ok(hit);
            }
            cache.data = self.get_byte_range(offset, Self::CACHE_SIZE).await?;
            cache.position = offset;
            if let Some(hit) = cache.get(offset, length) {
                return Ok(hit);
            }
        } else {
            let bytes = self.get_byte_range(offset, length).await?;
            if bytes.len() == length {
                return Ok(bytes);
            }
        }

        Err(DurationError::Stream(StreamError::new(format!(
            "Server returned fewer than {} bytes at offset {}",
            length, offset
        ))))
    }

    fn print_stats(&self) {
        SeekableHttpStream::print_stats(self)
    }

    fn http_request_count(&self) -> u64 {
        SeekableHttpStream::http_request_count(self)
    }

    fn http_request_bytes_read(&self) -> u64 {
        SeekableHttpStream::http_request_bytes_read(self)
    }
}
