use super::{DurationSource, DurationTier, ResolutionStep};
use crate::config::ScanConfig;
use crate::errors::{MediaResult, ProbeError, RemoteError};
use crate::mp4::find_duration;
use crate::probe::{corrected_duration, PlaybackProbe, ProbeGuard, SettleSlot};
use crate::remote::{guess_mime_type, parse_duration_reply, RemoteFallback, DURATION_INSTRUCTION};
use crate::streams::SeekableStream;
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

/// Reads the duration straight from the container's box tree.
pub struct BinaryTier {
    config: ScanConfig,
}

impl BinaryTier {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DurationTier for BinaryTier {
    fn source(&self) -> DurationSource {
        DurationSource::Binary
    }

    fn step(&self) -> ResolutionStep {
        ResolutionStep::Scanning
    }

    async fn resolve(&self, source: Arc<dyn SeekableStream>) -> MediaResult<f64> {
        let scan = find_duration(source.as_ref(), &self.config).await;
        source.print_stats();
        let scan = scan?;
        debug!(
            "{} {:?} header in {:?} window after {} header reads",
            scan.format.name(),
            scan.header.kind,
            scan.window,
            scan.header_reads
        );
        Ok(scan.seconds())
    }
}

/// Asks a playback engine, with seek correction, under a timeout.
pub struct ProbeTier {
    probe: Arc<dyn PlaybackProbe>,
    timeout: Duration,
}

impl ProbeTier {
    pub fn new(probe: Arc<dyn PlaybackProbe>, timeout: Duration) -> Self {
        Self { probe, timeout }
    }
}

#[async_trait]
impl DurationTier for ProbeTier {
    fn source(&self) -> DurationSource {
        DurationSource::Probe
    }

    fn step(&self) -> ResolutionStep {
        ResolutionStep::Verifying
    }

    async fn resolve(&self, source: Arc<dyn SeekableStream>) -> MediaResult<f64> {
        let (slot, outcome) = SettleSlot::<Result<f64, ProbeError>>::new();

        let probe_task = tokio::spawn({
            let slot = slot.clone();
            let probe = self.probe.clone();
            async move {
                let result = match probe.attach(source).await {
                    Ok(session) => {
                        let mut guard = ProbeGuard::new(session);
                        let result = corrected_duration(guard.session()).await;
                        guard.release();
                        result
                    }
                    Err(e) => Err(e),
                };
                if !slot.settle(result) {
                    debug!("{} finished after the probe was settled", probe.name());
                }
            }
        });

        let timer_task = tokio::spawn({
            let slot = slot.clone();
            let timeout = self.timeout;
            async move {
                tokio::time::sleep(timeout).await;
                slot.settle(Err(ProbeError::Timeout(timeout)));
            }
        });

        let result = outcome.await.unwrap_or_else(|_| {
            Err(ProbeError::Engine(
                "probe task ended without settling".to_string(),
            ))
        });

        // Cancelling drops the loser; its session guard detaches on drop.
        probe_task.abort();
        timer_task.abort();
        let _ = probe_task.await;
        let _ = timer_task.await;

        Ok(result?)
    }
}

/// Last resort: uploads the media and asks for the duration.
pub struct RemoteTier {
    fallback: Arc<dyn RemoteFallback>,
    max_payload_bytes: u64,
}

impl RemoteTier {
    pub fn new(fallback: Arc<dyn RemoteFallback>, max_payload_bytes: u64) -> Self {
        Self {
            fallback,
            max_payload_bytes,
        }
    }
}

#[async_trait]
impl DurationTier for RemoteTier {
    fn source(&self) -> DurationSource {
        DurationSource::Remote
    }

    fn step(&self) -> ResolutionStep {
        ResolutionStep::RemoteAnalysis
    }

    async fn resolve(&self, source: Arc<dyn SeekableStream>) -> MediaResult<f64> {
        let length = source.len();
        if length > self.max_payload_bytes {
            return Err(RemoteError::Unavailable(format!(
                "{} bytes exceeds the {} byte upload limit",
                length, self.max_payload_bytes
            ))
            .into());
        }

        let payload = source.read_range(0, length as usize).await?;
        let mime_type = guess_mime_type(source.location());
        let reply = self
            .fallback
            .ask(payload, mime_type, DURATION_INSTRUCTION)
            .await?;
        debug!("{} replied {:?}", self.fallback.name(), reply);
        Ok(parse_duration_reply(&reply)?)
    }
}
