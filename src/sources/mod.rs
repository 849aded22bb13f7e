//! Raw hardware sources and the per-architecture chain built from them

#[cfg(feature = "iohid")]
pub mod iohid;
#[cfg(feature = "powermetrics")]
pub mod powermetrics;
#[cfg(feature = "smc")]
pub mod smc;

use std::sync::Arc;

use crate::catalog::SourceKind;
use crate::device::DeviceProfile;
use crate::provider::{CompositeProvider, MergedProvider, SensorProvider};
use crate::router;

/// Which raw sources to try when assembling the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    pub powermetrics: bool,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self { powermetrics: true }
    }
}

/// Assemble the raw chain for this machine.
///
/// Directly readable sources are merged so the architecture's preferred kind
/// wins overlapping keys; `powermetrics` is the fallback when the merge comes
/// back empty.
pub fn raw_chain(device: &DeviceProfile, options: SourceOptions) -> Arc<dyn SensorProvider> {
    let mut direct: Vec<(SourceKind, Arc<dyn SensorProvider>)> = Vec::new();

    #[cfg(feature = "smc")]
    {
        match smc::SmcSensorSource::open() {
            Some(source) => direct.push((SourceKind::Smc, Arc::new(source))),
            None => tracing::debug!("SMC source unavailable"),
        }
    }

    #[cfg(feature = "iohid")]
    {
        match iohid::IoHidSensorSource::open() {
            Some(source) => direct.push((SourceKind::IoHwSensor, Arc::new(source))),
            None => tracing::debug!("IOHID source unavailable"),
        }
    }

    let names: Vec<&str> = direct.iter().map(|(_, s)| s.name()).collect();
    tracing::info!(sources = ?names, apple_silicon = device.is_apple_silicon, "raw sensor sources");

    let merged: Arc<dyn SensorProvider> =
        Arc::new(MergedProvider::new(router::order_for_merge(direct, device.is_apple_silicon)));
    let mut chain = vec![merged];

    #[cfg(feature = "powermetrics")]
    {
        if options.powermetrics {
            chain.push(Arc::new(powermetrics::PowermetricsSource::new()));
        }
    }
    #[cfg(not(feature = "powermetrics"))]
    let _ = options;

    if chain.len() == 1 {
        return chain.remove(0);
    }
    Arc::new(CompositeProvider::new(chain))
}
