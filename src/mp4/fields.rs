use crate::bits::reader::{u32_at, u64_at};
use serde::Serialize;

/// Timing fields shared by the movie header (`mvhd`) and the media header (`mdhd`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaHeaderFields {
    pub timescale: u32,
    pub duration_ticks: u64,
    pub version: u8,
}

impl MediaHeaderFields {
    /// Decode the full-box payload: version, 3 flag bytes, then creation and
    /// modification times whose width depends on the version.
    ///
    /// | version | timescale at | duration at | duration width |
    /// |---------|--------------|-------------|----------------|
    /// | 0       | 12           | 16          | 4              |
    /// | 1       | 20           | 24          | 8              |
    pub fn decode(payload: &[u8]) -> Option<Self> {
        let version = *payload.first()?;
        match version {
            0 => Some(Self {
                timescale: u32_at(payload, 12)?,
                duration_ticks: u32_at(payload, 16)? as u64,
                version,
            }),
            1 => Some(Self {
                timescale: u32_at(payload, 20)?,
                duration_ticks: u64_at(payload, 24)?,
                version,
            }),
            _ => None,
        }
    }

    /// All bits set in the duration field means "unknown".
    pub fn is_duration_unknown(&self) -> bool {
        match self.version {
            0 => self.duration_ticks == u32::MAX as u64,
            _ => self.duration_ticks == u64::MAX,
        }
    }

    /// `duration_ticks / timescale`, or `None` when the timescale is zero or
    /// the duration is flagged unknown.
    pub fn duration_seconds(&self) -> Option<f64> {
        if self.timescale == 0 || self.is_duration_unknown() {
            return None;
        }
        Some(self.duration_ticks as f64 / self.timescale as f64)
    }
}

/// Build a version 0 payload, as used by both `mvhd` and `mdhd`.
#[cfg(test)]
pub(crate) fn header_payload_v0(timescale: u32, duration: u32, tail: usize) -> Vec<u8> {
    let mut payload = vec![0u8; 12];
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.resize(payload.len() + tail, 0);
    payload
}

/// Build a version 1 payload, as used by both `mvhd` and `mdhd`.
#[cfg(test)]
pub(crate) fn header_payload_v1(timescale: u32, duration: u64, tail: usize) -> Vec<u8> {
    let mut payload = vec![1u8, 0, 0, 0];
    payload.extend_from_slice(&[0u8; 16]);
    payload.extend_from_slice(&timescale.to_be_bytes());
    payload.extend_from_slice(&duration.to_be_bytes());
    payload.resize(payload.len() + tail, 0);
    payload
}
