use darwin_telemetry::catalog::{self, CatalogOrigin, ValidationError, OVERRIDE_FILE_NAME};
use darwin_telemetry::Error;

use crate::common::{CatalogBuilder, ModelBuilder};

#[test]
fn test_override_file_wins_over_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(OVERRIDE_FILE_NAME);
    let json = CatalogBuilder::new()
        .with_model(ModelBuilder::new("Mac99,1").with_smc("cpu", "CPU", "cpu", "TC0P"))
        .to_json();
    std::fs::write(&path, json).unwrap();

    let (catalog, origin) = catalog::resolve(Some(&path));
    assert_eq!(origin, CatalogOrigin::Override(path.clone()));
    let catalog = catalog.unwrap();
    assert_eq!(catalog.models.len(), 1);
    assert_eq!(catalog.models[0].model_identifier, "Mac99,1");
}

#[test]
fn test_future_schema_override_means_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(OVERRIDE_FILE_NAME);
    let json = CatalogBuilder::new().with_schema_version(2).with_model(ModelBuilder::new("Mac99,1")).to_json();
    std::fs::write(&path, json).unwrap();

    assert!(matches!(
        catalog::load_file(&path),
        Err(Error::Catalog(ValidationError::UnsupportedSchemaVersion(2)))
    ));
    let (catalog, origin) = catalog::resolve(Some(&path));
    assert!(catalog.is_none());
    assert_eq!(origin, CatalogOrigin::Passthrough);
}

#[test]
fn test_duplicate_sensor_rejects_whole_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(OVERRIDE_FILE_NAME);
    let json = CatalogBuilder::new()
        .with_model(ModelBuilder::new("Mac99,1").with_smc("cpu", "CPU", "cpu", "TC0P"))
        .with_model(
            ModelBuilder::new("Mac99,2")
                .with_smc("gpu", "GPU", "gpu", "TG0P")
                .with_smc("gpu", "GPU again", "gpu", "TG1P"),
        )
        .to_json();
    std::fs::write(&path, json).unwrap();

    assert!(matches!(catalog::load_file(&path), Err(Error::Catalog(ValidationError::DuplicateSensor { .. }))));
    assert_eq!(catalog::resolve(Some(&path)).1, CatalogOrigin::Passthrough);
}

#[test]
fn test_inverted_os_range_rejected() {
    let catalog = CatalogBuilder::new()
        .with_model(ModelBuilder::new("Mac14,2").with_os_range(Some("14.0"), Some("13.5")))
        .build();
    assert!(matches!(catalog::validate(&catalog), Err(ValidationError::InvertedOsRange { .. })));
}

#[test]
fn test_missing_override_falls_back_to_bundled() {
    let dir = tempfile::tempdir().unwrap();
    let (catalog, origin) = catalog::resolve(Some(&dir.path().join(OVERRIDE_FILE_NAME)));
    assert_eq!(origin, CatalogOrigin::Bundled);
    assert_eq!(catalog, Some(catalog::bundled().unwrap()));
}
