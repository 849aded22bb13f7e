//! Darwin Telemetry - catalog-driven hardware sensor acquisition for macOS
//!
//! This crate reads temperatures, fan speeds and power from the SMC, the IOHID
//! temperature services and `powermetrics`, renames and normalizes them
//! through a versioned sensor catalog, and publishes one snapshot per tick
//! together with per-core CPU usage.
//!
//! # Overview
//!
//! - [`catalog`]: per-model sensor descriptions, loaded and validated atomically
//! - [`router`]: picks the catalog entry for the running model and OS version
//! - [`normalize`]: scale, offset, clamp and exponential smoothing
//! - [`provider`]: merging, fallback and catalog mapping over raw sources
//! - [`sources`]: SMC, IOHID and `powermetrics` readers
//! - [`scheduler`]: fixed-period ticks that drop rather than overlap
//! - [`telemetry`]: deduplicated soft-anomaly events and their sinks
//! - [`cpu`]: per-core usage from scheduler tick counters
//! - [`pipeline`]: the owned object that wires everything together
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use darwin_telemetry::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let pipeline = TelemetryPipeline::builder()
//!     .device(DeviceProfile::new("Mac14,2", "14.4", true))
//!     .catalog(Some(catalog::bundled()?), CatalogOrigin::Bundled)
//!     .raw_source(Arc::new(StaticProvider::new("fixture", [("TC0E", 45.0)])))
//!     .build();
//!
//! let snapshot = pipeline.tick().await;
//! assert_eq!(snapshot.readings.get("Efficiency Core 1"), Some(&45.0));
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Configuration and catalog loading return [`Result`]. Hardware reads never
//! fail the pipeline: an unavailable source is logged and treated as absent,
//! and the tick publishes whatever the remaining sources produced.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod cpu;
pub mod device;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod provider;
pub mod router;
pub mod scheduler;
pub mod sources;
pub mod telemetry;

pub use error::{Error, Result};

/// Re-export common types for convenience
pub mod prelude {
    pub use crate::catalog::{self, CatalogOrigin, SensorCatalog};
    pub use crate::config::{FeatureFlags, TelemetryConfig};
    pub use crate::device::DeviceProfile;
    pub use crate::pipeline::{TelemetryPipeline, TelemetrySnapshot};
    pub use crate::provider::{SensorProvider, SensorReadings, StaticProvider};
    pub use crate::telemetry::{SensorQuarantine, TelemetryEvent, TelemetryLogging};
    pub use crate::{Error, Result};
}
