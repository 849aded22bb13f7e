//! Operator configuration
//!
//! Read from `config.json` in the platform configuration directory
//! (`~/Library/Application Support/dev.darwin-telemetry.darwin-telemetry` on
//! macOS). A missing file means defaults.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::OVERRIDE_FILE_NAME;
use crate::error::Result;
use crate::provider::DEFAULT_SMOOTHING_TTL;
pub use crate::scheduler::MAX_JITTER_FRACTION;
use crate::telemetry::DEFAULT_QUARANTINE_TTL;

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 1000;
pub const MIN_SAMPLING_INTERVAL_MS: u64 = 500;
pub const MAX_SAMPLING_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_JITTER_FRACTION: f64 = 0.1;

/// Sensor groups hidden from the published map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlags {
    disabled_groups: BTreeSet<String>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disabled<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { disabled_groups: groups.into_iter().map(Into::into).collect() }
    }

    pub fn disable(&mut self, group: impl Into<String>) {
        self.disabled_groups.insert(group.into());
    }

    pub fn is_group_enabled(&self, group: &str) -> bool {
        !self.disabled_groups.contains(group)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryConfig {
    pub sampling_interval_ms: u64,
    pub jitter_fraction: f64,
    pub quarantine_ttl_secs: u64,
    /// Smoothing state older than this is discarded and re-seeded
    pub smoothing_ttl_secs: u64,
    /// Catalog file that takes precedence over the bundled one
    pub catalog_override: Option<PathBuf>,
    pub disabled_groups: FeatureFlags,
    /// Allow the `powermetrics` fallback source
    pub powermetrics: bool,
    /// Append telemetry events to this JSON-lines file
    pub telemetry_log: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
            quarantine_ttl_secs: DEFAULT_QUARANTINE_TTL.as_secs(),
            smoothing_ttl_secs: DEFAULT_SMOOTHING_TTL.as_secs(),
            catalog_override: None,
            disabled_groups: FeatureFlags::default(),
            powermetrics: true,
            telemetry_log: None,
        }
    }
}

impl TelemetryConfig {
    /// Load `config.json` from the platform configuration directory
    pub fn load() -> Result<Self> {
        let Some(dir) = config_dir() else {
            tracing::debug!("no configuration directory, using defaults");
            return Ok(Self::default());
        };
        Self::load_from_path(&dir.join(CONFIG_FILE_NAME))
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Publication cadence, clamped to the supported range
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms.clamp(MIN_SAMPLING_INTERVAL_MS, MAX_SAMPLING_INTERVAL_MS))
    }

    pub fn jitter(&self) -> f64 {
        if self.jitter_fraction.is_nan() {
            return 0.0;
        }
        self.jitter_fraction.clamp(0.0, MAX_JITTER_FRACTION)
    }

    pub fn quarantine_ttl(&self) -> Duration {
        Duration::from_secs(self.quarantine_ttl_secs)
    }

    pub fn smoothing_ttl(&self) -> Duration {
        Duration::from_secs(self.smoothing_ttl_secs)
    }

    /// Explicit override, else `sensor_catalog.json` next to `config.json`
    pub fn catalog_override_path(&self) -> Option<PathBuf> {
        self.catalog_override.clone().or_else(|| config_dir().map(|dir| dir.join(OVERRIDE_FILE_NAME)))
    }

    pub fn feature_flags(&self) -> &FeatureFlags {
        &self.disabled_groups
    }
}

/// Platform configuration directory for this crate
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "darwin-telemetry", "darwin-telemetry").map(|d| d.config_dir().to_path_buf())
}
