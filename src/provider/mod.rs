//! Provider composition
//!
//! Every raw source and every combinator implements [`SensorProvider`]:
//! "read a map of sensor key to value, or nothing". Combinators nest freely,
//! so the pipeline's chain is assembled from plain values rather than global
//! state.
//!
//! ```
//! use std::sync::Arc;
//! use darwin_telemetry::provider::{CompositeProvider, MergedProvider, SensorProvider, SensorReadings, StaticProvider};
//!
//! let smc = StaticProvider::new("smc", [("TC0P", 50.0), ("TB0T", 30.0)]);
//! let hid = StaticProvider::new("hid", [("TC0P", 52.0)]);
//! let merged = MergedProvider::new(vec![Arc::new(smc), Arc::new(hid)]);
//!
//! let fallback = CompositeProvider::new(vec![Arc::new(merged), Arc::new(StaticProvider::empty("none"))]);
//! let readings: SensorReadings = fallback.read().unwrap();
//! assert_eq!(readings["TC0P"], 52.0);
//! ```

mod cached;
mod composite;
mod mapping;
mod merged;


use std::collections::BTreeMap;

pub use cached::CachedSource;
pub use composite::CompositeProvider;
pub use mapping::{CatalogMappingProvider, CatalogMergedProvider, DEFAULT_SMOOTHING_TTL};
pub use merged::MergedProvider;

#[cfg(test)]
use mockall::automock;

/// Sensor key to value, ordered by key
pub type SensorReadings = BTreeMap<String, f64>;

/// Anything that can produce a map of sensor readings.
///
/// `None` means the source produced nothing this time. Implementations never
/// fail loudly; a broken source is simply absent.
#[cfg_attr(test, automock)]
pub trait SensorProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    fn read(&self) -> Option<SensorReadings>;
}

/// Fixed readings; useful for demos and tests
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: &'static str,
    readings: Option<SensorReadings>,
}

impl StaticProvider {
    pub fn new<K: Into<String>>(name: &'static str, readings: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self { name, readings: Some(readings.into_iter().map(|(k, v)| (k.into(), v)).collect()) }
    }

    /// A provider that is always absent
    pub fn empty(name: &'static str) -> Self {
        Self { name, readings: None }
    }
}

impl SensorProvider for StaticProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self) -> Option<SensorReadings> {
        self.readings.clone()
    }
}
