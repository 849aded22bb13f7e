use std::time::Duration;

use darwin_telemetry::catalog::CatalogOrigin;
use darwin_telemetry::config::TelemetryConfig;
use darwin_telemetry::pipeline::TelemetryPipeline;

#[tokio::test]
async fn test_pipeline_from_config_with_rejected_override() {
    let dir = tempfile::tempdir().unwrap();
    let override_path = dir.path().join("catalog.json");
    std::fs::write(&override_path, r#"{ "schemaVersion": 1, "models": [ { "modelIdentifier": "" } ] }"#).unwrap();
    let log_path = dir.path().join("logs").join("telemetry.jsonl");

    let config = TelemetryConfig {
        sampling_interval_ms: 750,
        catalog_override: Some(override_path),
        telemetry_log: Some(log_path.clone()),
        powermetrics: false,
        ..Default::default()
    };
    let pipeline = TelemetryPipeline::from_config(&config).unwrap();

    assert_eq!(pipeline.catalog_origin(), &CatalogOrigin::Passthrough);
    assert!(pipeline.matched_model().is_none());
    assert_eq!(pipeline.interval(), Duration::from_millis(750));
    assert!(log_path.exists());

    let snapshot = pipeline.tick().await;
    assert_eq!(pipeline.latest(), Some(snapshot));
}

#[tokio::test]
async fn test_config_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    std::fs::write(
        &config_path,
        format!(
            r#"{{ "samplingIntervalMs": 100, "powermetrics": false, "catalogOverride": {:?} }}"#,
            dir.path().join("absent.json")
        ),
    )
    .unwrap();

    let config = TelemetryConfig::load_from_path(&config_path).unwrap();
    let pipeline = TelemetryPipeline::from_config(&config).unwrap();

    // Clamped to the supported minimum
    assert_eq!(pipeline.interval(), Duration::from_millis(500));
    assert_eq!(pipeline.catalog_origin(), &CatalogOrigin::Bundled);
}
