//! Remote content-understanding fallback, used only when local tiers fail.

pub mod gemini;

pub use gemini::GeminiFallback;

use crate::errors::RemoteError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

/// The only question ever sent to the remote service.
pub const DURATION_INSTRUCTION: &str = "Return only the numeric duration of this video in seconds. \
Reply with a single number and nothing else.";

/// A remote service that answers a fixed instruction about a media payload.
/// One call, one outcome: implementations must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteFallback: Send + Sync {
    fn name(&self) -> &'static str;

    /// Send `payload` with `instruction` and return the raw text reply.
    async fn ask(
        &self,
        payload: Vec<u8>,
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, RemoteError>;
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid duration pattern"))
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d\s*:\s*\d").expect("valid clock pattern"))
}

/// The one decimal number in a reply, which must be a positive duration.
///
/// Clock-style (`1:30`) or multi-number (`2 minutes 5 seconds`) replies are
/// rejected rather than read as their first component.
pub fn parse_duration_reply(reply: &str) -> Result<f64, RemoteError> {
    let unparseable = || RemoteError::Unparseable(reply.trim().to_string());
    if clock_pattern().is_match(reply) {
        return Err(unparseable());
    }
    let mut numbers = number_pattern().find_iter(reply);
    let found = numbers.next().ok_or_else(unparseable)?;
    if numbers.next().is_some() {
        return Err(unparseable());
    }
    let seconds = found.as_str().parse::<f64>().map_err(|_| unparseable())?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(unparseable())
    }
}

/// MIME type for an upload, from the location's extension.
pub fn guess_mime_type(location: Option<&str>) -> &'static str {
    let extension = location
        .and_then(|l| l.split(['?', '#']).next())
        .and_then(|l| l.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mov") | Some("qt") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("3gp") => "video/3gpp",
        Some("3g2") => "video/3gpp2",
        Some("m4v") => "video/x-m4v",
        _ => "video/mp4",
    }
}
