//! Playback probe: delegate duration discovery to a real decoding engine.
//!
//! Engines can report a container-level duration that differs from what
//! actually plays, so the reported value is re-checked after seeking to the
//! reported end.

pub mod ffprobe;
pub mod settle;

pub use ffprobe::FfprobeProbe;
pub use settle::SettleSlot;

use crate::errors::ProbeError;
use crate::streams::SeekableStream;
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;

/// Seek target used when the engine cannot tell where the end is yet.
const SEEK_TO_END: f64 = 1e101;

/// A decoding engine that can be attached to a media source.
#[async_trait]
pub trait PlaybackProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Attach the engine to `source`. The returned session owns every engine
    /// resource until it is detached.
    async fn attach(
        &self,
        source: Arc<dyn SeekableStream>,
    ) -> Result<Box<dyn ProbeSession>, ProbeError>;
}

/// An attached engine.
#[async_trait]
pub trait ProbeSession: Send {
    /// Wait for the readiness signal and return the initial duration. May be
    /// infinite when the engine only knows the stream is unbounded so far.
    async fn ready(&mut self) -> Result<f64, ProbeError>;

    /// Seek to `position` seconds and return the duration reported once the
    /// seek completes.
    async fn seek(&mut self, position: f64) -> Result<f64, ProbeError>;

    /// Release engine resources.
    fn detach(&mut self);
}

/// Detaches its session exactly once: explicitly through `release`, or on
/// drop when the owning task is cancelled.
pub struct ProbeGuard {
    session: Box<dyn ProbeSession>,
    detached: bool,
}

impl ProbeGuard {
    pub fn new(session: Box<dyn ProbeSession>) -> Self {
        Self {
            session,
            detached: false,
        }
    }

    pub fn session(&mut self) -> &mut dyn ProbeSession {
        self.session.as_mut()
    }

    pub fn release(mut self) {
        self.detach_once();
    }

    fn detach_once(&mut self) {
        if !self.detached {
            self.detached = true;
            self.session.detach();
        }
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.detach_once();
    }
}

/// Read the initial duration, then seek to it and prefer the post-seek value
/// when it differs and is finite.
pub async fn corrected_duration(session: &mut dyn ProbeSession) -> Result<f64, ProbeError> {
    let initial = session.ready().await?;
    let target = if initial.is_finite() {
        initial
    } else {
        SEEK_TO_END
    };

    let duration = match session.seek(target).await {
        Ok(after) if after.is_finite() && after != initial => {
            debug!("probe duration corrected from {} to {} after seek", initial, after);
            after
        }
        Ok(_) => initial,
        Err(e) => {
            warn!("probe seek correction failed, keeping {}: {}", initial, e);
            initial
        }
    };

    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(ProbeError::FormatRejected(format!(
            "engine reported no usable duration ({})",
            duration
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedSession {
        ready: Result<f64, ProbeError>,
        after_seek: Result<f64, ProbeError>,
        seeks: Vec<f64>,
        detached: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ProbeSession for ScriptedSession {
        async fn ready(&mut self) -> Result<f64, ProbeError> {
            self.ready.clone()
        }

        async fn seek(&mut self, position: f64) -> Result<f64, ProbeError> {
            self.seeks.push(position);
            self.after_seek.clone()
        }

        fn detach(&mut self) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn session(ready: Result<f64, ProbeError>, after: Result<f64, ProbeError>) -> ScriptedSession {
        ScriptedSession {
            ready,
            after_seek: after,
            seeks: Vec::new(),
            detached: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[tokio::test]
    async fn test_post_seek_value_is_authoritative() {
        let mut s = session(Ok(10.0), Ok(9.98));
        assert_eq!(corrected_duration(&mut s).await, Ok(9.98));
        assert_eq!(s.seeks, vec![10.0]);
    }

    #[tokio::test]
    async fn test_non_finite_or_failed_seek_keeps_initial() {
        let mut s = session(Ok(10.0), Ok(f64::NAN));
        assert_eq!(corrected_duration(&mut s).await, Ok(10.0));

        let mut s = session(Ok(10.0), Err(ProbeError::Engine("seek".into())));
        assert_eq!(corrected_duration(&mut s).await, Ok(10.0));
    }

    #[tokio::test]
    async fn test_unbounded_initial_duration_seeks_far() {
        let mut s = session(Ok(f64::INFINITY), Ok(61.5));
        assert_eq!(corrected_duration(&mut s).await, Ok(61.5));
        assert_eq!(s.seeks, vec![SEEK_TO_END]);

        let mut s = session(Ok(f64::INFINITY), Ok(f64::INFINITY));
        assert!(matches!(
            corrected_duration(&mut s).await,
            Err(ProbeError::FormatRejected(_))
        ));
    }

    #[tokio::test]
    async fn test_ready_error_propagates() {
        let mut s = session(Err(ProbeError::FormatRejected("bad".into())), Ok(1.0));
        assert_eq!(
            corrected_duration(&mut s).await,
            Err(ProbeError::FormatRejected("bad".into()))
        );
        assert!(s.seeks.is_empty());
    }

    #[test]
    fn test_guard_detaches_exactly_once() {
        let detached = Arc::new(AtomicUsize::new(0));
        let mut s = session(Ok(1.0), Ok(1.0));
        s.detached = detached.clone();
        ProbeGuard::new(Box::new(s)).release();
        assert_eq!(detached.load(Ordering::SeqCst), 1);

        let mut s = session(Ok(1.0), Ok(1.0));
        s.detached = detached.clone();
        drop(ProbeGuard::new(Box::new(s)));
        assert_eq!(detached.load(Ordering::SeqCst), 2);
    }
}
