//! Soft-anomaly events and the sinks that record them
//!
//! Nothing here interrupts sampling. Events are produced by
//! [`SensorQuarantine`] after TTL deduplication and handed to whichever
//! [`TelemetryLogging`] sink the pipeline was built with.

mod quarantine;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use quarantine::{SensorQuarantine, DEFAULT_QUARANTINE_TTL};

use crate::catalog::SensorUnit;
use crate::error::Result;

/// A soft anomaly observed while mapping raw readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TelemetryEvent {
    /// A raw key that the matched catalog model does not describe
    #[serde(rename_all = "camelCase")]
    MissingChannel { group: String, channel: String },

    /// A raw key that a different OS-range entry of the same model maps
    #[serde(rename_all = "camelCase")]
    RenamedChannel { model: String, channel: String, previous_name: String },

    /// A normalized value outside the plausible range for its unit
    #[serde(rename_all = "camelCase")]
    ValueAnomaly { sensor: String, value: f64, unit: SensorUnit },
}

/// Sink for telemetry events
pub trait TelemetryLogging: Send + Sync {
    fn record(&self, event: TelemetryEvent);
}

/// Default sink: forwards each event to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetryLogger;

impl TelemetryLogging for TracingTelemetryLogger {
    fn record(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::MissingChannel { group, channel } => {
                tracing::info!(target: "darwin_telemetry::telemetry", %group, %channel, "unmapped sensor channel");
            },
            TelemetryEvent::RenamedChannel { model, channel, previous_name } => {
                tracing::info!(
                    target: "darwin_telemetry::telemetry",
                    %model,
                    %channel,
                    %previous_name,
                    "sensor channel mapped under a different OS range"
                );
            },
            TelemetryEvent::ValueAnomaly { sensor, value, unit } => {
                tracing::warn!(
                    target: "darwin_telemetry::telemetry",
                    %sensor,
                    value,
                    unit = unit.symbol(),
                    "implausible sensor value"
                );
            },
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryTelemetryLogger {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemoryTelemetryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetryLogging for MemoryTelemetryLogger {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}

/// Appends one JSON object per event to a file
#[derive(Debug)]
pub struct JsonLinesTelemetryLogger {
    file: Mutex<File>,
}

impl JsonLinesTelemetryLogger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl TelemetryLogging for JsonLinesTelemetryLogger {
    fn record(&self, event: TelemetryEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(error = %e, "failed to encode telemetry event");
                return;
            },
        };
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}") {
            tracing::debug!(error = %e, "failed to append telemetry event");
        }
    }
}
