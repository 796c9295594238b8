use super::{PlaybackProbe, ProbeSession};
use crate::config::ProbeConfig;
use crate::errors::ProbeError;
use crate::streams::SeekableStream;
use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Playback probe backed by the `ffprobe` executable.
///
/// Readiness is `format=duration`. The seek pass reads packets from shortly
/// before the reported end and takes the latest `pts + duration`, which is
/// what actually plays.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    ffprobe_path: String,
    correction_window_secs: f64,
}

impl FfprobeProbe {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            ffprobe_path: config.ffprobe_path.clone(),
            correction_window_secs: config.correction_window_secs,
        }
    }
}

#[async_trait]
impl PlaybackProbe for FfprobeProbe {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn attach(
        &self,
        source: Arc<dyn SeekableStream>,
    ) -> Result<Box<dyn ProbeSession>, ProbeError> {
        let location = source
            .location()
            .ok_or_else(|| ProbeError::Engine("source has no path or URL".to_string()))?
            .to_string();
        Ok(Box::new(FfprobeSession {
            ffprobe_path: self.ffprobe_path.clone(),
            correction_window_secs: self.correction_window_secs,
            location,
            detached: false,
        }))
    }
}

struct FfprobeSession {
    ffprobe_path: String,
    correction_window_secs: f64,
    location: String,
    detached: bool,
}

impl FfprobeSession {
    /// Run ffprobe and return stdout. The child is killed if this future is
    /// dropped before it finishes.
    async fn run(&self, args: &[&str]) -> Result<String, ProbeError> {
        if self.detached {
            return Err(ProbeError::Engine("session already detached".to_string()));
        }
        debug!("{} {}", self.ffprobe_path, args.join(" "));
        let output = Command::new(&self.ffprobe_path)
            .args(args)
            .arg(&self.location)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProbeError::Engine(format!("failed to run {}: {}", self.ffprobe_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::FormatRejected(stderr.trim().to_string()));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| ProbeError::Engine(format!("ffprobe output is not UTF-8: {}", e)))
    }
}

#[async_trait]
impl ProbeSession for FfprobeSession {
    async fn ready(&mut self) -> Result<f64, ProbeError> {
        let stdout = self
            .run(&[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .await?;
        parse_format_duration(&stdout)
    }

    async fn seek(&mut self, position: f64) -> Result<f64, ProbeError> {
        let from = if position.is_finite() {
            (position - self.correction_window_secs).max(0.0)
        } else {
            0.0
        };
        let interval = format!("{:.3}%", from);
        let stdout = self
            .run(&[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-read_intervals",
                &interval,
                "-show_entries",
                "packet=pts_time,duration_time",
                "-of",
                "csv=p=0",
            ])
            .await?;
        last_packet_end(&stdout).ok_or_else(|| {
            ProbeError::Engine(format!("no timed packets after {:.3}s", from))
        })
    }

    fn detach(&mut self) {
        debug!("detaching ffprobe session for {}", self.location);
        self.detached = true;
    }
}

/// `format=duration` output. `N/A` means the engine could not bound the
/// stream, reported as an infinite duration so the seek pass runs from 0.
pub(crate) fn parse_format_duration(stdout: &str) -> Result<f64, ProbeError> {
    let value = stdout.lines().map(str::trim).find(|l| !l.is_empty());
    match value {
        Some("N/A") => Ok(f64::INFINITY),
        Some(text) => text
            .parse::<f64>()
            .map_err(|_| ProbeError::Engine(format!("unexpected duration output {:?}", text))),
        None => Err(ProbeError::FormatRejected(
            "engine reported no duration".to_string(),
        )),
    }
}

/// Largest `pts_time + duration_time` across `pts,duration` CSV lines.
pub(crate) fn last_packet_end(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut fields = line.trim().split(',');
            let pts = fields.next()?.parse::<f64>().ok()?;
            let duration = fields
                .next()
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(0.0);
            Some(pts + duration)
        })
        .filter(|end| end.is_finite())
        .fold(None, |max: Option<f64>, end| {
            Some(max.map_or(end, |m| m.max(end)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::MemorySeekableStream;

    #[test]
    fn test_parse_format_duration() {
        assert_eq!(parse_format_duration("10.010000\n"), Ok(10.01));
        assert_eq!(parse_format_duration("N/A\n"), Ok(f64::INFINITY));
        assert!(matches!(
            parse_format_duration(""),
            Err(ProbeError::FormatRejected(_))
        ));
        assert!(matches!(
            parse_format_duration("garbage"),
            Err(ProbeError::Engine(_))
        ));
    }

    #[test]
    fn test_last_packet_end() {
        let csv = "9.900000,0.033367\n9.933367,0.033367\n9.966733,0.013267\nN/A,0.04\n";
        let end = last_packet_end(csv).unwrap();
        assert!((end - 9.98).abs() < 1e-6);
        assert_eq!(last_packet_end(""), None);
        assert_eq!(last_packet_end("4.5,N/A"), Some(4.5));
    }

    #[tokio::test]
    async fn test_attach_requires_location() {
        let probe = FfprobeProbe::new(&ProbeConfig::default());
        let anonymous: Arc<dyn SeekableStream> = Arc::new(MemorySeekableStream::new(vec![0; 8]));
        assert!(matches!(
            probe.attach(anonymous).await,
            Err(ProbeError::Engine(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_engine_is_engine_error() {
        let config = ProbeConfig {
            ffprobe_path: "/nonexistent/ffprobe-binary".to_string(),
            ..ProbeConfig::default()
        };
        let probe = FfprobeProbe::new(&config);
        let source: Arc<dyn SeekableStream> =
            Arc::new(MemorySeekableStream::new(vec![0; 8]).with_name("clip.mp4"));
        let mut session = probe.attach(source).await.unwrap();
        assert!(matches!(session.ready().await, Err(ProbeError::Engine(_))));
        session.detach();
        assert!(matches!(session.seek(1.0).await, Err(ProbeError::Engine(_))));
    }
}
