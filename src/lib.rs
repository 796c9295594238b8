pub mod bits;
pub use bits::reader::{read_fourcc, read_u32, read_u64};

pub mod mp4;
pub use mp4::{detect_format, find_duration, BoxScan, ContainerFormat, DurationHeader};

pub mod streams;
pub use streams::{
    open_source, LocalSeekableStream, MemorySeekableStream, SeekableHttpStream, SeekableStream,
};

pub mod config;
pub use config::{ProbeConfig, QueueConfig, RemoteConfig, ResolverConfig, ScanConfig};

pub mod probe;
pub use probe::{FfprobeProbe, PlaybackProbe, ProbeSession};

pub mod remote;
pub use remote::{GeminiFallback, RemoteFallback};

pub mod resolver;
pub use resolver::{
    DurationResolver, DurationSource, DurationTier, ResolutionStep, ResolvedDuration,
};

pub mod queue;
pub use queue::{BatchQueue, ItemId, ItemStatus, QueueEvent, QueueItem, QueueStats};

pub mod errors;
pub use errors::{
    ConfigError, DurationError, MediaResult, ParseError, ProbeError, QueueError, RemoteError,
    StreamError,
};

/// Resolve the duration of a local file or http(s) URL with the default
/// chain: box parsing, then ffprobe, then the remote service when
/// `MEDIADURATION_REMOTE_API_KEY` is set.
pub async fn resolve_duration(source: String) -> MediaResult<ResolvedDuration> {
    let mut config = ResolverConfig::default();
    config.remote = RemoteConfig::from_env();
    resolve_duration_with(&config, source).await
}

pub async fn resolve_duration_with(
    config: &ResolverConfig,
    source: String,
) -> MediaResult<ResolvedDuration> {
    config.validate()?;
    let stream = open_source(&source).await?;
    DurationResolver::from_config(config)
        .resolve(stream, &|_| {})
        .await
}

/// Read only the container header; no fallbacks.
pub async fn scan_duration(source: String) -> MediaResult<f64> {
    let stream = open_source(&source).await?;
    let scan = find_duration(stream.as_ref(), &ScanConfig::default()).await?;
    Ok(scan.seconds())
}
