use crate::errors::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Box traversal bounds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bytes fetched from the start of the source for the first pass.
    pub start_window: usize,
    /// Bytes fetched from the end of the source when the first pass fails.
    pub end_window: usize,
    /// Header reads allowed on the outermost level of a window.
    pub top_level_attempts: usize,
    /// Header reads allowed on each level inside the movie box.
    pub nested_attempts: usize,
    /// Deepest container nesting that is entered.
    pub max_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            start_window: 256 * 1024,
            end_window: 512 * 1024,
            top_level_attempts: 50,
            nested_attempts: 100,
            max_depth: 8,
        }
    }
}

/// Playback probe settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// Bound on the whole probe (readiness plus seek correction).
    pub timeout_ms: u64,
    pub ffprobe_path: String,
    /// How far before the reported end the correction pass starts reading.
    pub correction_window_secs: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 8_000,
            ffprobe_path: "ffprobe".to_string(),
            correction_window_secs: 5.0,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Remote fallback settings. The tier only runs with an API key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Sources larger than this are never uploaded.
    pub max_payload_bytes: u64,
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            max_payload_bytes: 20 * 1024 * 1024,
            timeout_ms: 60_000,
        }
    }
}

impl RemoteConfig {
    pub const API_KEY_VAR: &'static str = "MEDIADURATION_REMOTE_API_KEY";
    pub const MODEL_VAR: &'static str = "MEDIADURATION_REMOTE_MODEL";
    pub const ENDPOINT_VAR: &'static str = "MEDIADURATION_REMOTE_ENDPOINT";

    /// Defaults overridden by `MEDIADURATION_REMOTE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(Self::API_KEY_VAR) {
            if !key.trim().is_empty() {
                config.api_key = Some(key.trim().to_string());
            }
        }
        if let Ok(model) = std::env::var(Self::MODEL_VAR) {
            config.model = model;
        }
        if let Ok(endpoint) = std::env::var(Self::ENDPOINT_VAR) {
            config.endpoint = endpoint;
        }
        config
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Batch queue settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Items resolved at once. 1 processes the queue strictly in order.
    pub max_parallel: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_parallel: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub scan: ScanConfig,
    pub probe: ProbeConfig,
    pub remote: RemoteConfig,
    pub queue: QueueConfig,
}

impl ResolverConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::new(format!("Invalid resolver config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.start_window < 16 || self.scan.end_window < 16 {
            return Err(ConfigError::new("scan windows must hold at least one box header"));
        }
        if self.scan.top_level_attempts == 0 || self.scan.nested_attempts == 0 {
            return Err(ConfigError::new("attempt budgets must be positive"));
        }
        if self.queue.max_parallel == 0 {
            return Err(ConfigError::new("queue.max_parallel must be at least 1"));
        }
        if !self.probe.correction_window_secs.is_finite() || self.probe.correction_window_secs < 0.0
        {
            return Err(ConfigError::new("probe.correction_window_secs must be >= 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.scan.start_window, 256 * 1024);
        assert_eq!(config.scan.end_window, 512 * 1024);
        assert_eq!(config.scan.top_level_attempts, 50);
        assert_eq!(config.scan.nested_attempts, 100);
        assert_eq!(config.queue.max_parallel, 1);
        assert!(!config.remote.is_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ResolverConfig::from_json_str(
            r#"{ "probe": { "timeout_ms": 5000 }, "queue": { "max_parallel": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.probe.timeout(), Duration::from_secs(5));
        assert_eq!(config.probe.ffprobe_path, "ffprobe");
        assert_eq!(config.queue.max_parallel, 4);
        assert_eq!(config.scan, ScanConfig::default());
    }

    #[test]
    fn test_invalid_json_and_values() {
        assert!(ResolverConfig::from_json_str("{ not json").is_err());
        let err = ResolverConfig::from_json_str(r#"{ "queue": { "max_parallel": 0 } }"#)
            .unwrap_err();
        assert!(err.message.contains("max_parallel"));
    }
}
