use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{SensorProvider, SensorReadings};
use crate::cache::ValueCache;

/// Serves a source's last result for `ttl`, so two consumers in one tick
/// share a single hardware read.
///
/// Absence is cached too, until `invalidate` or the TTL runs out.
pub struct CachedSource {
    inner: Arc<dyn SensorProvider>,
    cache: ValueCache<(), Option<SensorReadings>>,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn SensorProvider>, ttl: Duration) -> Self {
        Self { inner, cache: ValueCache::new(ttl) }
    }

    /// Drop the cached result so the next read hits the source
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

impl SensorProvider for CachedSource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn read(&self) -> Option<SensorReadings> {
        let now = Instant::now();
        if let Some(readings) = self.cache.get(&(), now) {
            return readings;
        }
        let readings = self.inner.read();
        self.cache.set((), readings.clone(), now);
        readings
    }
}
