use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{SensorProvider, SensorReadings};
use crate::cache::ValueCache;
use crate::catalog::{ModelCatalog, SensorCatalog, SensorSource};
use crate::config::FeatureFlags;
use crate::device::DeviceProfile;
use crate::normalize;
use crate::router;
use crate::telemetry::SensorQuarantine;

pub const DEFAULT_SMOOTHING_TTL: Duration = Duration::from_secs(30);

/// The catalog entry selected for this device, with its lookup tables
#[derive(Debug)]
struct ResolvedModel {
    model: ModelCatalog,
    /// Every raw key the model consumes, feature-flag hidden sensors included
    covered: HashSet<String>,
    /// Raw key to friendly name from the model's other OS-range entries
    alternates: HashMap<String, String>,
}

impl ResolvedModel {
    fn resolve(catalog: &SensorCatalog, device: &DeviceProfile) -> Option<Self> {
        let model = router::select_model(catalog, device)?.clone();
        let covered: HashSet<String> =
            model.sensors.iter().filter_map(|s| s.source.raw_lookup_key()).map(str::to_string).collect();

        let mut alternates = HashMap::new();
        for other in router::models_for(catalog, device).filter(|m| **m != model) {
            for sensor in &other.sensors {
                if let Some(key) = sensor.source.raw_lookup_key() {
                    if !covered.contains(key) {
                        alternates.entry(key.to_string()).or_insert_with(|| sensor.friendly_name.clone());
                    }
                }
            }
        }

        Some(Self { model, covered, alternates })
    }
}

/// Renames and normalizes raw readings through the catalog.
///
/// Without a catalog, or when no entry matches the device, raw readings pass
/// through unchanged.
pub struct CatalogMappingProvider {
    resolved: Option<ResolvedModel>,
    flags: FeatureFlags,
    raw: Arc<dyn SensorProvider>,
    smoothing: ValueCache<String, f64>,
    quarantine: Option<Arc<SensorQuarantine>>,
}

impl CatalogMappingProvider {
    pub fn new(
        device: &DeviceProfile,
        catalog: Option<&SensorCatalog>,
        flags: FeatureFlags,
        raw: Arc<dyn SensorProvider>,
    ) -> Self {
        let resolved = catalog.and_then(|c| ResolvedModel::resolve(c, device));
        match &resolved {
            Some(r) => tracing::info!(
                model = %r.model.model_identifier,
                os_min = ?r.model.os_min,
                os_max = ?r.model.os_max,
                sensors = r.model.sensors.len(),
                "matched catalog model"
            ),
            None if catalog.is_some() => {
                tracing::info!(model = %device.model_identifier, os = %device.os_version, "no catalog entry for device")
            },
            None => {},
        }
        Self { resolved, flags, raw, smoothing: ValueCache::new(DEFAULT_SMOOTHING_TTL), quarantine: None }
    }

    /// Report implausible values through `quarantine`
    pub fn with_quarantine(mut self, quarantine: Arc<SensorQuarantine>) -> Self {
        self.quarantine = Some(quarantine);
        self
    }

    /// Smoothing state untouched for longer than `ttl` is re-seeded
    pub fn with_smoothing_ttl(mut self, ttl: Duration) -> Self {
        self.smoothing = ValueCache::new(ttl);
        self
    }

    pub fn matched_model(&self) -> Option<&ModelCatalog> {
        self.resolved.as_ref().map(|r| &r.model)
    }

    /// Whether `key` is consumed by the matched model
    pub fn covers(&self, key: &str) -> bool {
        self.resolved.as_ref().is_some_and(|r| r.covered.contains(key))
    }

    /// Friendly name another OS range of this model gives `key`
    pub fn alternate_name(&self, key: &str) -> Option<&str> {
        self.resolved.as_ref()?.alternates.get(key).map(String::as_str)
    }

    /// Catalog friendly name for a raw key of the matched model
    pub fn friendly_name(&self, key: &str) -> Option<&str> {
        self.matched_model()?
            .sensors
            .iter()
            .find(|s| s.source.raw_lookup_key() == Some(key))
            .map(|s| s.friendly_name.as_str())
    }

    pub(crate) fn quarantine(&self) -> Option<&Arc<SensorQuarantine>> {
        self.quarantine.as_ref()
    }

    /// Apply the matched model to one raw map
    pub fn map_readings(&self, raw: &SensorReadings, now: Instant) -> SensorReadings {
        let Some(resolved) = &self.resolved else {
            return raw.clone();
        };

        let mut mapped = SensorReadings::new();
        for sensor in &resolved.model.sensors {
            if sensor.primary_group().is_some_and(|g| !self.flags.is_group_enabled(g)) {
                continue;
            }
            if matches!(sensor.source, SensorSource::Derived { .. }) {
                continue;
            }
            let Some(&value) = sensor.source.raw_lookup_key().and_then(|key| raw.get(key)) else {
                continue;
            };

            let previous = self.smoothing.get(&sensor.id, now);
            let (value, state) = normalize::apply(value, sensor.transform.as_ref(), previous);
            if let Some(state) = state {
                self.smoothing.set(sensor.id.clone(), state, now);
            }

            let (low, high) = sensor.unit.plausible_range();
            if !(low..=high).contains(&value) {
                if let Some(quarantine) = &self.quarantine {
                    quarantine.seen_anomaly(&sensor.friendly_name, value, sensor.unit, now);
                }
            }

            mapped.insert(sensor.friendly_name.clone(), value);
        }
        mapped
    }
}

impl SensorProvider for CatalogMappingProvider {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn read(&self) -> Option<SensorReadings> {
        let raw = self.raw.read()?;
        Some(self.map_readings(&raw, Instant::now()))
    }
}

/// Catalog-mapped readings plus every raw reading the catalog does not
/// describe, under its raw key.
///
/// Friendly names win on collision. Raw keys consumed by the matched model
/// are never republished, even when their sensor is hidden by a feature flag.
/// Unmapped keys are reported through the mapping provider's quarantine.
pub struct CatalogMergedProvider {
    catalog: Arc<CatalogMappingProvider>,
    raw: Arc<dyn SensorProvider>,
}

impl CatalogMergedProvider {
    pub fn new(catalog: Arc<CatalogMappingProvider>, raw: Arc<dyn SensorProvider>) -> Self {
        Self { catalog, raw }
    }

    fn report_unmapped(&self, key: &str, now: Instant) {
        let (Some(model), Some(quarantine)) = (self.catalog.matched_model(), self.catalog.quarantine()) else {
            return;
        };
        match self.catalog.alternate_name(key) {
            Some(previous) => quarantine.seen_renamed(&model.model_identifier, key, previous, now),
            None => quarantine.seen_unknown(&model.model_identifier, key, now),
        };
    }
}

impl SensorProvider for CatalogMergedProvider {
    fn name(&self) -> &'static str {
        "catalog-merged"
    }

    fn read(&self) -> Option<SensorReadings> {
        let mapped = self.catalog.read();
        let raw = self.raw.read();
        if mapped.is_none() && raw.is_none() {
            return None;
        }

        let now = Instant::now();
        let mut result = mapped.unwrap_or_default();
        for (key, value) in raw.unwrap_or_default() {
            if result.contains_key(&key) || self.catalog.covers(&key) {
                continue;
            }
            self.report_unmapped(&key, now);
            result.insert(key, value);
        }
        Some(result)
    }
}
