//! The owned acquisition pipeline
//!
//! One [`TelemetryPipeline`] per process holds the device profile, the active
//! catalog, the provider chain, the CPU tick tracker, the quarantine and the
//! scheduler. Each tick produces a [`TelemetrySnapshot`] that is published
//! through a `watch` channel; consumers only ever get receivers.
//!
//! ```no_run
//! use darwin_telemetry::config::TelemetryConfig;
//! use darwin_telemetry::pipeline::TelemetryPipeline;
//!
//! # async fn run() -> darwin_telemetry::Result<()> {
//! let pipeline = TelemetryPipeline::from_config(&TelemetryConfig::load()?)?;
//! let mut snapshots = pipeline.subscribe();
//! pipeline.start()?;
//!
//! snapshots.changed().await.ok();
//! if let Some(snapshot) = snapshots.borrow().as_ref() {
//!     for (name, value) in &snapshot.readings {
//!         println!("{}: {value:.1}", pipeline.display_name(name));
//!     }
//! }
//! pipeline.stop();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use crate::catalog::{self, CatalogOrigin, ModelCatalog, SensorCatalog};
use crate::config::{FeatureFlags, TelemetryConfig, DEFAULT_JITTER_FRACTION, DEFAULT_SAMPLING_INTERVAL_MS};
use crate::cpu::{CpuTickSource, HostProcessorTicks, UsageTracker};
use crate::device::DeviceProfile;
use crate::error::Result;
use crate::provider::{
    CachedSource, CatalogMappingProvider, CatalogMergedProvider, SensorProvider, SensorReadings, DEFAULT_SMOOTHING_TTL,
};
use crate::scheduler::{SamplingScheduler, TickHandler};
use crate::sources::{self, SourceOptions};
use crate::telemetry::{
    JsonLinesTelemetryLogger, SensorQuarantine, TelemetryLogging, TracingTelemetryLogger, DEFAULT_QUARANTINE_TTL,
};

/// Everything published for one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Friendly name (or raw key) to Celsius / RPM / Watts
    pub readings: SensorReadings,
    /// Busy fraction per core; empty on the first tick
    pub per_core_usage: Vec<f64>,
    pub taken_at: SystemTime,
}

/// Performs one sample and publishes it; shared with the scheduler
struct Sampler {
    cached: Arc<CachedSource>,
    provider: Arc<dyn SensorProvider>,
    usage: Arc<UsageTracker>,
    publisher: watch::Sender<Option<TelemetrySnapshot>>,
}

impl Sampler {
    async fn sample(&self) -> TelemetrySnapshot {
        // One hardware read per tick, shared by the mapped and merged paths
        self.cached.invalidate();

        let provider = self.provider.clone();
        let usage = self.usage.clone();
        let (readings, per_core_usage) = tokio::join!(
            tokio::task::spawn_blocking(move || provider.read()),
            tokio::task::spawn_blocking(move || usage.sample()),
        );

        let readings = match readings {
            Ok(Some(readings)) => readings,
            Ok(None) => {
                tracing::debug!("no sensor readings this tick");
                SensorReadings::new()
            },
            Err(e) => {
                tracing::warn!(error = %e, "sensor read task failed");
                SensorReadings::new()
            },
        };
        let per_core_usage = per_core_usage.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cpu usage task failed");
            Vec::new()
        });

        let snapshot = TelemetrySnapshot { readings, per_core_usage, taken_at: SystemTime::now() };
        tracing::trace!(readings = snapshot.readings.len(), cores = snapshot.per_core_usage.len(), "published snapshot");
        self.publisher.send_replace(Some(snapshot.clone()));
        snapshot
    }
}

#[async_trait]
impl TickHandler for Sampler {
    async fn on_tick(&self) {
        self.sample().await;
    }
}

pub struct TelemetryPipeline {
    device: DeviceProfile,
    origin: CatalogOrigin,
    mapping: Arc<CatalogMappingProvider>,
    quarantine: Arc<SensorQuarantine>,
    sampler: Arc<Sampler>,
    scheduler: SamplingScheduler,
    receiver: watch::Receiver<Option<TelemetrySnapshot>>,
}

impl TelemetryPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Build the production pipeline for this machine
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        let logger: Arc<dyn TelemetryLogging> = match &config.telemetry_log {
            Some(path) => Arc::new(JsonLinesTelemetryLogger::open(path)?),
            None => Arc::new(TracingTelemetryLogger),
        };
        let override_path = config.catalog_override_path();
        let (catalog, origin) = catalog::resolve(override_path.as_deref());
        let device = DeviceProfile::detect();
        let raw = sources::raw_chain(&device, SourceOptions { powermetrics: config.powermetrics });

        Ok(Self::builder()
            .device(device)
            .catalog(catalog, origin)
            .raw_source(raw)
            .feature_flags(config.feature_flags().clone())
            .telemetry_logger(logger)
            .quarantine_ttl(config.quarantine_ttl())
            .smoothing_ttl(config.smoothing_ttl())
            .interval(config.sampling_interval())
            .jitter(config.jitter())
            .build())
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    /// Where the active catalog came from
    pub fn catalog_origin(&self) -> &CatalogOrigin {
        &self.origin
    }

    /// The catalog entry in use, `None` in passthrough mode
    pub fn matched_model(&self) -> Option<&ModelCatalog> {
        self.mapping.matched_model()
    }

    pub fn quarantine(&self) -> &Arc<SensorQuarantine> {
        &self.quarantine
    }

    /// A receiver that sees every published snapshot; `None` until the first tick
    pub fn subscribe(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.receiver.clone()
    }

    /// The most recently published snapshot
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        self.receiver.borrow().clone()
    }

    /// Sample once, publish, and return what was published
    pub async fn tick(&self) -> TelemetrySnapshot {
        self.sampler.sample().await
    }

    /// Begin periodic sampling on the current tokio runtime
    pub fn start(&self) -> Result<()> {
        self.scheduler.start()
    }

    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn interval(&self) -> Duration {
        self.scheduler.interval()
    }

    pub fn update_interval(&self, interval: Duration) -> Result<()> {
        self.scheduler.update_interval(interval)
    }

    /// Label for a published key.
    ///
    /// Catalog friendly names are already published as keys; a raw key gets
    /// its catalog name if it has one, else the SMC naming patterns, else the
    /// key itself.
    pub fn display_name(&self, key: &str) -> String {
        if let Some(name) = self.mapping.friendly_name(key) {
            return name.to_string();
        }
        #[cfg(feature = "smc")]
        {
            if let Some(name) = sources::smc::friendly_name(key) {
                return name;
            }
        }
        key.to_string()
    }
}

/// Assembles a [`TelemetryPipeline`]; unset parts fall back to the local machine
pub struct PipelineBuilder {
    device: Option<DeviceProfile>,
    catalog: Option<SensorCatalog>,
    origin: CatalogOrigin,
    raw: Option<Arc<dyn SensorProvider>>,
    cpu: Option<Box<dyn CpuTickSource>>,
    flags: FeatureFlags,
    logger: Arc<dyn TelemetryLogging>,
    quarantine_ttl: Duration,
    smoothing_ttl: Duration,
    interval: Duration,
    jitter: f64,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            device: None,
            catalog: None,
            origin: CatalogOrigin::Passthrough,
            raw: None,
            cpu: None,
            flags: FeatureFlags::default(),
            logger: Arc::new(TracingTelemetryLogger),
            quarantine_ttl: DEFAULT_QUARANTINE_TTL,
            smoothing_ttl: DEFAULT_SMOOTHING_TTL,
            interval: Duration::from_millis(DEFAULT_SAMPLING_INTERVAL_MS),
            jitter: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl PipelineBuilder {
    pub fn device(mut self, device: DeviceProfile) -> Self {
        self.device = Some(device);
        self
    }

    pub fn catalog(mut self, catalog: Option<SensorCatalog>, origin: CatalogOrigin) -> Self {
        self.catalog = catalog;
        self.origin = origin;
        self
    }

    /// Raw reading source; defaults to the hardware chain for the device
    pub fn raw_source(mut self, raw: Arc<dyn SensorProvider>) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn cpu_source(mut self, cpu: Box<dyn CpuTickSource>) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn feature_flags(mut self, flags: FeatureFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn telemetry_logger(mut self, logger: Arc<dyn TelemetryLogging>) -> Self {
        self.logger = logger;
        self
    }

    pub fn quarantine_ttl(mut self, ttl: Duration) -> Self {
        self.quarantine_ttl = ttl;
        self
    }

    pub fn smoothing_ttl(mut self, ttl: Duration) -> Self {
        self.smoothing_ttl = ttl;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn jitter(mut self, fraction: f64) -> Self {
        self.jitter = fraction;
        self
    }

    pub fn build(self) -> TelemetryPipeline {
        let device = self.device.unwrap_or_else(DeviceProfile::detect);
        let raw = self.raw.unwrap_or_else(|| sources::raw_chain(&device, SourceOptions::default()));
        let cached = Arc::new(CachedSource::new(raw, self.interval / 2));
        let shared_raw: Arc<dyn SensorProvider> = cached.clone();

        let quarantine = Arc::new(SensorQuarantine::new(self.quarantine_ttl, self.logger));
        let mapping = Arc::new(
            CatalogMappingProvider::new(&device, self.catalog.as_ref(), self.flags, shared_raw.clone())
                .with_quarantine(quarantine.clone())
                .with_smoothing_ttl(self.smoothing_ttl),
        );
        let provider: Arc<dyn SensorProvider> = Arc::new(CatalogMergedProvider::new(mapping.clone(), shared_raw));

        let cpu = self.cpu.unwrap_or_else(|| Box::new(HostProcessorTicks));
        let (publisher, receiver) = watch::channel(None);
        let sampler = Arc::new(Sampler { cached, provider, usage: Arc::new(UsageTracker::new(cpu)), publisher });
        let scheduler = SamplingScheduler::new(self.interval, self.jitter, sampler.clone());

        tracing::info!(
            model = %device.model_identifier,
            catalog = ?self.origin,
            matched = mapping.matched_model().is_some(),
            "telemetry pipeline ready"
        );

        TelemetryPipeline { device, origin: self.origin, mapping, quarantine, sampler, scheduler, receiver }
    }
}
