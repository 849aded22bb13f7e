use std::sync::Arc;

use super::{SensorProvider, SensorReadings};

/// Ordered fallback chain: the first provider with a non-empty result wins
pub struct CompositeProvider {
    providers: Vec<Arc<dyn SensorProvider>>,
}

impl CompositeProvider {
    /// `providers[0]` is the primary, the rest are fallbacks in order
    pub fn new(providers: Vec<Arc<dyn SensorProvider>>) -> Self {
        Self { providers }
    }
}

impl SensorProvider for CompositeProvider {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn read(&self) -> Option<SensorReadings> {
        for provider in &self.providers {
            match provider.read() {
                Some(readings) if !readings.is_empty() => return Some(readings),
                // An empty map counts as absent
                _ => tracing::debug!(provider = provider.name(), "provider produced nothing, falling back"),
            }
        }
        None
    }
}
