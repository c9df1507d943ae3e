use crate::defaults;
use crate::error::CallscribeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub speech: SpeechConfig,
}

/// Session and routing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub pool_size: usize,
    pub routing_mode: RoutingMode,
    pub idle_release_ticks: u32,
}

/// Recognition engine configuration.
///
/// The subscription key is an explicit value handed to the channel pool at
/// construction — there is no process-wide credential singleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub region: String,
    pub subscription_key: String,
    pub start_timeout_ms: u64,
    pub stop_timeout_ms: u64,
}

/// How delivered audio events are routed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Forward the single mixed buffer to one default transcription path.
    Mixed,
    /// Route per-speaker sub-buffers onto the channel pool with silence backfill.
    Unmixed,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pool_size: defaults::POOL_SIZE,
            routing_mode: RoutingMode::Unmixed,
            idle_release_ticks: defaults::IDLE_RELEASE_TICKS,
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            region: defaults::REGION.to_string(),
            subscription_key: String::new(),
            start_timeout_ms: defaults::START_TIMEOUT_MS,
            stop_timeout_ms: defaults::STOP_TIMEOUT_MS,
        }
    }
}

impl SpeechConfig {
    /// Engine startup confirmation timeout.
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    /// Engine session-stop confirmation timeout.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks constraints the field types cannot express.
    pub fn validate(&self) -> Result<(), CallscribeError> {
        if self.session.pool_size == 0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "session.pool_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session.idle_release_ticks == 0 {
            return Err(CallscribeError::ConfigInvalidValue {
                key: "session.idle_release_ticks".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CALLSCRIBE_SPEECH_KEY → speech.subscription_key
    /// - CALLSCRIBE_SPEECH_REGION → speech.region
    /// - CALLSCRIBE_POOL_SIZE → session.pool_size
    /// - CALLSCRIBE_ROUTING_MODE → session.routing_mode ("mixed" or "unmixed")
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("CALLSCRIBE_SPEECH_KEY")
            && !key.is_empty()
        {
            self.speech.subscription_key = key;
        }

        if let Ok(region) = std::env::var("CALLSCRIBE_SPEECH_REGION")
            && !region.is_empty()
        {
            self.speech.region = region;
        }

        if let Ok(size) = std::env::var("CALLSCRIBE_POOL_SIZE")
            && let Ok(size) = size.parse::<usize>()
            && size > 0
        {
            self.session.pool_size = size;
        }

        if let Ok(mode) = std::env::var("CALLSCRIBE_ROUTING_MODE") {
            match mode.as_str() {
                "mixed" => self.session.routing_mode = RoutingMode::Mixed,
                "unmixed" => self.session.routing_mode = RoutingMode::Unmixed,
                _ => {}
            }
        }

        self
    }
}
