use super::types::QueueItem;
use crate::errors::MediaResult;
use crate::streams::{open_source, SeekableStream};
use async_trait::async_trait;
use std::sync::Arc;

/// Opens the byte source behind a queue item.
#[async_trait]
pub trait MediaSourceProvider: Send + Sync {
    async fn open(&self, item: &QueueItem) -> MediaResult<Arc<dyn SeekableStream>>;
}

/// Treats `location` as a local path or an http(s) URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocationProvider;

#[async_trait]
impl MediaSourceProvider for LocationProvider {
    async fn open(&self, item: &QueueItem) -> MediaResult<Arc<dyn SeekableStream>> {
        open_source(&item.location).await
    }
}
