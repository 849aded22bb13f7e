use std::sync::Arc;

use darwin_telemetry::catalog::{self, CatalogOrigin, SensorCatalog};
use darwin_telemetry::config::FeatureFlags;
use darwin_telemetry::device::DeviceProfile;
use darwin_telemetry::pipeline::{PipelineBuilder, TelemetryPipeline};
use darwin_telemetry::telemetry::{MemoryTelemetryLogger, TelemetryEvent};

use crate::common::{CatalogBuilder, CountingProvider, FixedTicks, ModelBuilder};

fn sonoma_mac14_2() -> DeviceProfile {
    DeviceProfile::new("Mac14,2", "14.4", true)
}

fn bundled() -> SensorCatalog {
    catalog::bundled().unwrap()
}

fn builder(raw: Arc<CountingProvider>, catalog: Option<SensorCatalog>) -> PipelineBuilder {
    let origin = if catalog.is_some() { CatalogOrigin::Bundled } else { CatalogOrigin::Passthrough };
    TelemetryPipeline::builder()
        .device(sonoma_mac14_2())
        .catalog(catalog, origin)
        .raw_source(raw)
        .cpu_source(Box::new(FixedTicks::new(2, 30, 70)))
}

#[tokio::test]
async fn test_catalog_key_published_under_friendly_name() {
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0)]));
    let pipeline = builder(raw, Some(bundled())).build();

    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.get("Efficiency Core 1"), Some(&45.0));
    assert!(!snapshot.readings.contains_key("TC0E"));
}

#[tokio::test]
async fn test_passthrough_without_catalog() {
    let raw = Arc::new(CountingProvider::new(&[("TB0T", 29.0)]));
    let pipeline = builder(raw, None).build();

    assert!(pipeline.matched_model().is_none());
    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.len(), 1);
    assert_eq!(snapshot.readings.get("TB0T"), Some(&29.0));
}

#[tokio::test]
async fn test_unmatched_os_version_is_passthrough() {
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0)]));
    let pipeline = builder(raw, Some(bundled())).device(DeviceProfile::new("Mac14,2", "12.6", true)).build();

    assert!(pipeline.matched_model().is_none());
    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.get("TC0E"), Some(&45.0));
}

#[tokio::test]
async fn test_key_from_other_os_range_reported_as_renamed() {
    let logger = Arc::new(MemoryTelemetryLogger::new());
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0), ("Tp09", 47.0)]));
    let pipeline = builder(raw, Some(bundled())).telemetry_logger(logger.clone()).build();

    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.get("Efficiency Core 1"), Some(&45.0));
    assert_eq!(snapshot.readings.get("Tp09"), Some(&47.0));
    assert_eq!(
        logger.events(),
        vec![TelemetryEvent::RenamedChannel {
            model: "Mac14,2".to_string(),
            channel: "Tp09".to_string(),
            previous_name: "Efficiency Core 1".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_unknown_key_reported_once_across_ticks() {
    let logger = Arc::new(MemoryTelemetryLogger::new());
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0), ("Tz9Q", 12.0)]));
    let pipeline = builder(raw, Some(bundled())).telemetry_logger(logger.clone()).build();

    for _ in 0..3 {
        let snapshot = pipeline.tick().await;
        assert_eq!(snapshot.readings.get("Tz9Q"), Some(&12.0));
    }
    assert_eq!(
        logger.events(),
        vec![TelemetryEvent::MissingChannel { group: "Mac14,2".to_string(), channel: "Tz9Q".to_string() }]
    );
}

#[tokio::test]
async fn test_disabled_group_hides_sensor_and_its_raw_key() {
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0), ("TG0P", 40.0)]));
    let pipeline = builder(raw, Some(bundled())).feature_flags(FeatureFlags::with_disabled(["cpu"])).build();

    let snapshot = pipeline.tick().await;
    assert!(!snapshot.readings.contains_key("Efficiency Core 1"));
    assert!(!snapshot.readings.contains_key("TC0E"));
    assert_eq!(snapshot.readings.get("GPU Cluster 1"), Some(&40.0));
}

#[tokio::test]
async fn test_implausible_value_is_published_and_reported() {
    let logger = Arc::new(MemoryTelemetryLogger::new());
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 212.0)]));
    let pipeline = builder(raw, Some(bundled())).telemetry_logger(logger.clone()).build();

    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.get("Efficiency Core 1"), Some(&212.0));
    assert!(matches!(
        logger.events().as_slice(),
        [TelemetryEvent::ValueAnomaly { sensor, value, .. }] if sensor == "Efficiency Core 1" && *value == 212.0
    ));
}

#[tokio::test]
async fn test_smoothing_carries_across_ticks() {
    let raw = Arc::new(CountingProvider::new(&[("TC0P", 50.0)]));
    let pipeline = builder(raw.clone(), Some(bundled())).build();

    let first = pipeline.tick().await;
    assert_eq!(first.readings.get("Performance Core 1"), Some(&50.0));

    raw.set(&[("TC0P", 60.0)]);
    let second = pipeline.tick().await;
    let smoothed = second.readings["Performance Core 1"];
    assert!((smoothed - 53.0).abs() < 1e-9, "smoothed to {smoothed}");
}

#[tokio::test]
async fn test_raw_source_read_once_per_tick() {
    let raw = Arc::new(CountingProvider::new(&[("TC0E", 45.0), ("Tz9Q", 12.0)]));
    let pipeline = builder(raw.clone(), Some(bundled())).build();

    pipeline.tick().await;
    pipeline.tick().await;
    assert_eq!(raw.reads(), 2);
}

#[tokio::test]
async fn test_absent_raw_source_read_once_per_tick() {
    let raw = Arc::new(CountingProvider::absent());
    let pipeline = builder(raw.clone(), Some(bundled())).build();

    pipeline.tick().await;
    assert_eq!(raw.reads(), 1);
    pipeline.tick().await;
    assert_eq!(raw.reads(), 2);
}

#[tokio::test]
async fn test_absent_source_still_publishes_cpu_usage() {
    let raw = Arc::new(CountingProvider::absent());
    let pipeline = builder(raw, Some(bundled())).build();

    let first = pipeline.tick().await;
    assert!(first.readings.is_empty());
    assert!(first.per_core_usage.is_empty());

    let second = pipeline.tick().await;
    assert_eq!(second.per_core_usage, vec![0.3, 0.3]);
}

#[tokio::test]
async fn test_builder_catalog_from_builders() {
    let catalog = CatalogBuilder::new()
        .with_model(ModelBuilder::new("Mac15,3").with_smc("cpu-p1", "P-Core 1", "cpu", "Tp01").with_fan("fan", "Fan", "F0Ac"))
        .build();
    catalog::validate(&catalog).unwrap();

    let raw = Arc::new(CountingProvider::new(&[("Tp01", 61.5), ("F0Ac", -3.0)]));
    let pipeline = builder(raw, Some(catalog)).device(DeviceProfile::new("Mac15,3", "15.0", true)).build();

    let snapshot = pipeline.tick().await;
    assert_eq!(snapshot.readings.get("P-Core 1"), Some(&61.5));
    assert_eq!(snapshot.readings.get("Fan"), Some(&0.0));
}

#[tokio::test]
async fn test_display_name_fallbacks() {
    let raw = Arc::new(CountingProvider::absent());
    let pipeline = builder(raw, Some(bundled())).build();

    assert_eq!(pipeline.display_name("TC1E"), "Efficiency Core 2");
    assert_eq!(pipeline.display_name("TC3P"), "CPU Performance Core 4");
    assert_eq!(pipeline.display_name("Efficiency Core 1"), "Efficiency Core 1");
}
