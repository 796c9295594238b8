pub mod seekable_http_stream;
pub mod seekable_stream;


pub use seekable_http_stream::SeekableHttpStream;
pub use seekable_stream::{LocalSeekableStream, MemorySeekableStream, SeekableStream};

use crate::errors::MediaResult;
use std::sync::Arc;

/// Open a media source from a path or an `http(s)://` URL.
pub async fn open_source(location: &str) -> MediaResult<Arc<dyn SeekableStream>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let stream = SeekableHttpStream::new(location.to_string()).await?;
        Ok(Arc::new(stream))
    } else {
        let stream = LocalSeekableStream::open(location).await?;
        Ok(Arc::new(stream))
    }
}
