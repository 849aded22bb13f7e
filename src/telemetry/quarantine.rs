use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::ValueCache;
use crate::catalog::SensorUnit;

use super::{TelemetryEvent, TelemetryLogging};

/// How long a reported key stays quiet
pub const DEFAULT_QUARANTINE_TTL: Duration = Duration::from_secs(3600);

/// TTL-deduplicated reporting of sensor anomalies.
///
/// Each distinct key produces one event per TTL window. Repeats inside the
/// window are dropped; the first occurrence after the window reports again
/// and opens a new window.
pub struct SensorQuarantine {
    seen: ValueCache<String, ()>,
    logger: Arc<dyn TelemetryLogging>,
}

impl std::fmt::Debug for SensorQuarantine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorQuarantine").field("ttl", &self.seen.ttl()).finish()
    }
}

impl SensorQuarantine {
    pub fn new(ttl: Duration, logger: Arc<dyn TelemetryLogging>) -> Self {
        Self { seen: ValueCache::new(ttl), logger }
    }

    /// Report an unmapped `group::channel`. Returns whether an event was emitted.
    pub fn seen_unknown(&self, group: &str, channel: &str, now: Instant) -> bool {
        self.report(format!("{group}::{channel}"), now, || TelemetryEvent::MissingChannel {
            group: group.to_string(),
            channel: channel.to_string(),
        })
    }

    /// Report a raw key that another OS range of `model` knows as `previous_name`
    pub fn seen_renamed(&self, model: &str, channel: &str, previous_name: &str, now: Instant) -> bool {
        self.report(format!("renamed::{model}::{channel}"), now, || TelemetryEvent::RenamedChannel {
            model: model.to_string(),
            channel: channel.to_string(),
            previous_name: previous_name.to_string(),
        })
    }

    /// Report an implausible value for `sensor`, deduplicated per sensor
    pub fn seen_anomaly(&self, sensor: &str, value: f64, unit: SensorUnit, now: Instant) -> bool {
        self.report(format!("anomaly::{sensor}"), now, || TelemetryEvent::ValueAnomaly {
            sensor: sensor.to_string(),
            value,
            unit,
        })
    }

    fn report(&self, key: String, now: Instant, event: impl FnOnce() -> TelemetryEvent) -> bool {
        if self.seen.get(&key, now).is_some() {
            return false;
        }
        self.seen.set(key, (), now);
        self.logger.record(event());
        true
    }
}
