/*!
# Configuration

Every tunable of the heuristic lives here with defaults equal to the
constants the detector has always shipped with.
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reconcile::ConflictPolicy;
use crate::store::StoreFormat;
use crate::{Error, Result};

/// Instruction sent to the remote classifier alongside the trajectory.
pub const DEFAULT_REMOTE_PROMPT: &str = "Analyze the attached full mouse movement data. \
Return a single numeric classification value: 1 if the movements indicate bot behavior \
(including automation using PyAutoGUI) or 0 if they indicate human behavior. \
Only return the number 1 or 0 without any extra text.";

/// Key under which the session's sample buffer is mirrored for replay.
pub const DEFAULT_DIAGNOSTIC_KEY: &str = "mouseMovementData";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Local classifier and analyzer thresholds
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Observation window and reconciliation settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Remote classifier settings
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Diagnostic sample persistence
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Thresholds of the local rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Mean speed above which movement counts as fast (px/s)
    pub speed_px_per_s: f64,
    /// Speed standard deviation above which movement counts as erratic (px/s)
    pub std_dev_px_per_s: f64,
    /// Interval length above which an interval is idle (ms)
    pub idle_interval_ms: i64,
    /// Fewest samples for the local classifier to give an opinion
    pub min_samples: usize,
}

/// Observation window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Observation window length (ms)
    pub window_ms: u64,
    /// Upper bound on waiting for the remote verdict (ms); expiry counts as UNKNOWN
    pub remote_timeout_ms: u64,
    /// Tie-break when local and remote verdicts disagree
    pub conflict_policy: ConflictPolicy,
    /// Remove the mirrored sample buffer once the session is done
    pub clear_diagnostics_on_done: bool,
}

/// Remote classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Classifier endpoint; without one every decision is local-only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Instruction sent with the trajectory
    pub prompt: String,
    /// Total requests per classification, first try included (>= 1)
    pub max_attempts: u32,
    /// Per-request timeout (ms)
    pub request_timeout_ms: u64,
}

/// Diagnostic store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Mirror the buffer on every append
    pub enabled: bool,
    /// Directory for the file store
    pub dir: PathBuf,
    /// Storage key
    pub key: String,
    /// Serialization format
    pub format: StoreFormat,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            speed_px_per_s: 30.0,
            std_dev_px_per_s: 10.0,
            idle_interval_ms: 500,
            min_samples: 5,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_ms: 15_000,
            remote_timeout_ms: 10_000,
            conflict_policy: ConflictPolicy::FavorHuman,
            clear_diagnostics_on_done: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            prompt: DEFAULT_REMOTE_PROMPT.to_string(),
            max_attempts: 2,
            request_timeout_ms: 4_000,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("data"),
            key: DEFAULT_DIAGNOSTIC_KEY.to_string(),
            format: StoreFormat::Json,
        }
    }
}

impl SessionConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

impl DetectorConfig {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err with a description of the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !t.speed_px_per_s.is_finite() || t.speed_px_per_s < 0.0 {
            return Err(Error::Config(format!(
                "speed_px_per_s must be finite and >= 0, got {}",
                t.speed_px_per_s
            )));
        }
        if !t.std_dev_px_per_s.is_finite() || t.std_dev_px_per_s < 0.0 {
            return Err(Error::Config(format!(
                "std_dev_px_per_s must be finite and >= 0, got {}",
                t.std_dev_px_per_s
            )));
        }
        if t.idle_interval_ms < 0 {
            return Err(Error::Config(format!(
                "idle_interval_ms must be >= 0, got {}",
                t.idle_interval_ms
            )));
        }
        if t.min_samples < 2 {
            return Err(Error::Config(format!(
                "min_samples must be >= 2, got {}",
                t.min_samples
            )));
        }
        if self.session.window_ms == 0 {
            return Err(Error::Config("window_ms must be > 0".to_string()));
        }
        if self.session.remote_timeout_ms == 0 {
            return Err(Error::Config("remote_timeout_ms must be > 0".to_string()));
        }
        if self.remote.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be >= 1".to_string()));
        }
        if self.remote.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be > 0".to_string()));
        }
        if self.session.remote_timeout_ms < self.remote.request_timeout_ms {
            return Err(Error::Config(format!(
                "remote_timeout_ms ({}) must cover at least one request of request_timeout_ms ({})",
                self.session.remote_timeout_ms, self.remote.request_timeout_ms
            )));
        }
        if let Some(endpoint) = &self.remote.endpoint
            && endpoint.trim().is_empty()
        {
            return Err(Error::Config("remote endpoint must not be empty".to_string()));
        }
        if self.diagnostics.key.trim().is_empty() {
            return Err(Error::Config("diagnostics key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
