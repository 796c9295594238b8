use crate::errors::{DurationError, MediaResult, ParseError, StreamError};
use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Random-access byte source of known length, backed by a local file, an
/// HTTP resource or an in-memory buffer.
///
/// Reads never need the whole source in memory: callers ask for the exact
/// range they want and the implementation fetches only that.
#[async_trait]
pub trait SeekableStream: Send + Sync {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path or URL the bytes come from, if the source is addressable.
    fn location(&self) -> Option<&str> {
        None
    }

    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// Fails with [`ParseError::ShortRead`] when the source ends before the
    /// requested range does.
    async fn read_range(&self, offset: u64, length: usize) -> MediaResult<Vec<u8>>;

    /// Read up to `max_len` bytes at `offset`, stopping at the end of the source.
    async fn read_clamped(&self, offset: u64, max_len: usize) -> MediaResult<Vec<u8>> {
        let available = self.len().saturating_sub(offset);
        let length = (max_len as u64).min(available) as usize;
        if length == 0 {
            return Ok(Vec::new());
        }
        self.read_range(offset, length).await
    }

    fn print_stats(&self) {}
    fn http_request_count(&self) -> u64 {
        0
    }
    fn http_request_bytes_read(&self) -> u64 {
        0
    }
}

/// Check a requested range against the source length.
pub(crate) fn check_range(total: u64, offset: u64, length: usize) -> Result<(), ParseError> {
    let end = offset.checked_add(length as u64);
    match end {
        Some(end) if end <= total => Ok(()),
        _ => Err(ParseError::ShortRead {
            offset,
            requested: length as u64,
            available: total.saturating_sub(offset),
        }),
    }
}

/// Local file wrapper
pub struct LocalSeekableStream {
    file: Mutex<File>,
    length: u64,
    path: String,
}

impl LocalSeekableStream {
    pub async fn open<P: AsRef<Path>>(path: P) -> MediaResult<Self> {
        let file = File::open(path.as_ref()).await?;
        let length = file.metadata().await?.len();
        Ok(LocalSeekableStream {
            file: Mutex::new(file),
            length,
            path: path.as_ref().to_string_lossy().into_owned(),
        })
    }
}

#[async_trait]
impl SeekableStream for LocalSeekableStream {
    fn len(&self) -> u64 {
        self.length
    }

    fn location(&self) -> Option<&str> {
        Some(&self.path)
    }

    async fn read_range(&self, offset: u64, length: usize) -> MediaResult<Vec<u8>> {
        check_range(self.length, offset, length)?;
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; length];
        match file.read_exact(&mut buf).await {
            Ok(_) => Ok(buf),
            // The file shrank after it was opened.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(DurationError::Parse(ParseError::ShortRead {
                    offset,
                    requested: length as u64,
                    available: 0,
                }))
            }
            Err(e) => Err(DurationError::Stream(StreamError::new(format!(
                "Failed to read {} bytes at {} from {}: {}",
                length, offset, self.path, e
            )))),
        }
    }
}

/// In-memory source, e.g. a buffer fetched over the network.
pub struct MemorySeekableStream {
    data: Vec<u8>,
    name: Option<String>,
}

impl MemorySeekableStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, name: None }
    }

    /// Attach a display name reported as the source location.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl SeekableStream for MemorySeekableStream {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn location(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn read_range(&self, offset: u64, length: usize) -> MediaResult<Vec<u8>> {
        check_range(self.len(), offset, length)?;
        let start = offset as usize;
        Ok(self.data[start..start + length].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_memory_stream_short_read() {
        let stream = MemorySeekableStream::new(vec![1, 2, 3, 4]);
        assert_eq!(stream.read_range(1, 2).await.unwrap(), vec![2, 3]);

        match stream.read_range(2, 4).await {
            Err(DurationError::Parse(ParseError::ShortRead {
                offset,
                requested,
                available,
            })) => {
                assert_eq!((offset, requested, available), (2, 4, 2));
            }
            other => panic!("expected short read, got {:?}", other.map(|b| b.len())),
        }

        assert_eq!(stream.read_clamped(2, 100).await.unwrap(), vec![3, 4]);
        assert!(stream.read_clamped(10, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_stream_reads_arbitrary_offsets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let stream = LocalSeekableStream::open(file.path()).await.unwrap();
        assert_eq!(stream.len(), 10);
        assert_eq!(stream.read_range(7, 3).await.unwrap(), b"789".to_vec());
        assert_eq!(stream.read_range(0, 2).await.unwrap(), b"01".to_vec());
        assert!(stream.read_range(8, 3).await.is_err());
        assert!(stream.location().is_some());
    }
}
