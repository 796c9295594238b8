//! Duration resolution: an ordered list of tiers, each returning a tagged
//! result. The first success ends the chain and records which tier produced
//! the value.

mod tiers;
pub use tiers::{BinaryTier, ProbeTier, RemoteTier};


use crate::config::ResolverConfig;
use crate::errors::{DurationError, MediaResult, ParseError};
use crate::probe::FfprobeProbe;
use crate::remote::GeminiFallback;
use crate::streams::SeekableStream;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Which tier produced a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationSource {
    Binary,
    Probe,
    Remote,
}

impl DurationSource {
    pub fn name(&self) -> &'static str {
        match self {
            DurationSource::Binary => "binary",
            DurationSource::Probe => "probe",
            DurationSource::Remote => "remote",
        }
    }
}

/// A resolved duration and its provenance. Never modified after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedDuration {
    pub seconds: f64,
    pub source: DurationSource,
}

/// Phase reported to observers as tiers start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionStep {
    Scanning,
    Verifying,
    RemoteAnalysis,
}

impl ResolutionStep {
    pub fn label(&self) -> &'static str {
        match self {
            ResolutionStep::Scanning => "scanning",
            ResolutionStep::Verifying => "verifying",
            ResolutionStep::RemoteAnalysis => "AI analysis",
        }
    }
}

/// One strategy in the fallback chain.
#[async_trait]
pub trait DurationTier: Send + Sync {
    fn source(&self) -> DurationSource;

    fn step(&self) -> ResolutionStep;

    /// Duration in seconds, or why this tier could not produce one.
    async fn resolve(&self, source: Arc<dyn SeekableStream>) -> MediaResult<f64>;
}

pub struct DurationResolver {
    tiers: Vec<Box<dyn DurationTier>>,
}

impl DurationResolver {
    pub fn new(tiers: Vec<Box<dyn DurationTier>>) -> Self {
        Self { tiers }
    }

    /// Binary tier, then ffprobe when enabled, then the remote service when
    /// an API key is configured.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut tiers: Vec<Box<dyn DurationTier>> =
            vec![Box::new(BinaryTier::new(config.scan.clone()))];

        if config.probe.enabled {
            tiers.push(Box::new(ProbeTier::new(
                Arc::new(FfprobeProbe::new(&config.probe)),
                config.probe.timeout(),
            )));
        }

        if config.remote.is_enabled() {
            match GeminiFallback::new(&config.remote) {
                Ok(fallback) => tiers.push(Box::new(RemoteTier::new(
                    Arc::new(fallback),
                    config.remote.max_payload_bytes,
                ))),
                Err(e) => warn!("remote fallback disabled: {}", e),
            }
        }

        Self { tiers }
    }

    pub fn tier_sources(&self) -> Vec<DurationSource> {
        self.tiers.iter().map(|t| t.source()).collect()
    }

    /// Run the tiers in order until one succeeds.
    ///
    /// `on_step` is told about each tier as it starts. It cannot fail the
    /// resolution: a panicking callback is logged and ignored.
    pub async fn resolve(
        &self,
        source: Arc<dyn SeekableStream>,
        on_step: &(dyn Fn(ResolutionStep) + Send + Sync),
    ) -> MediaResult<ResolvedDuration> {
        let mut attempts = Vec::with_capacity(self.tiers.len());

        for tier in &self.tiers {
            notify(on_step, tier.step());
            match tier.resolve(source.clone()).await {
                Ok(seconds) => {
                    info!(
                        "{}: {:.3}s from {} tier",
                        source.location().unwrap_or("<memory>"),
                        seconds,
                        tier.source().name()
                    );
                    return Ok(ResolvedDuration {
                        seconds,
                        source: tier.source(),
                    });
                }
                Err(DurationError::Parse(ParseError::NotFound)) => {
                    debug!("{} tier found no duration", tier.source().name());
                    attempts.push(format!("{}: {}", tier.source().name(), ParseError::NotFound));
                }
                Err(e) => {
                    warn!("{} tier failed: {}", tier.source().name(), e);
                    attempts.push(format!("{}: {}", tier.source().name(), e));
                }
            }
        }

        Err(DurationError::Exhausted { attempts })
    }
}

fn notify(on_step: &(dyn Fn(ResolutionStep) + Send + Sync), step: ResolutionStep) {
    if catch_unwind(AssertUnwindSafe(|| on_step(step))).is_err() {
        warn!("step observer panicked on {:?}", step);
    }
}
