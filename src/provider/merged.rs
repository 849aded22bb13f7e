use std::sync::Arc;

use super::{SensorProvider, SensorReadings};

/// Union of several providers; on overlapping keys the later provider wins.
///
/// Ordering is significant: build the list with
/// [`order_for_merge`](crate::router::order_for_merge) so the preferred
/// source kind comes last.
pub struct MergedProvider {
    providers: Vec<Arc<dyn SensorProvider>>,
}

impl MergedProvider {
    pub fn new(providers: Vec<Arc<dyn SensorProvider>>) -> Self {
        Self { providers }
    }
}

impl SensorProvider for MergedProvider {
    fn name(&self) -> &'static str {
        "merged"
    }

    fn read(&self) -> Option<SensorReadings> {
        let mut merged: Option<SensorReadings> = None;
        for provider in &self.providers {
            match provider.read() {
                Some(readings) => merged.get_or_insert_with(SensorReadings::new).extend(readings),
                None => tracing::trace!(provider = provider.name(), "provider absent"),
            }
        }
        merged
    }
}
