//! Sensor catalog: the versioned, per-model description of which sensors exist,
//! where their raw values come from and how they are normalized.
//!
//! A catalog is adopted atomically. [`load`] either returns a fully validated
//! [`SensorCatalog`] or a [`ValidationError`]; nothing from a rejected document
//! is ever used.
//!
//! # Examples
//!
//! ```
//! use darwin_telemetry::catalog;
//!
//! let json = br#"{
//!     "schemaVersion": 1,
//!     "models": [{
//!         "modelIdentifier": "Mac14,2",
//!         "sensors": [{
//!             "id": "cpu-e1",
//!             "friendlyName": "Efficiency Core 1",
//!             "unit": "celsius",
//!             "groups": ["cpu"],
//!             "source": { "kind": "smc", "key": "TC0E" }
//!         }]
//!     }]
//! }"#;
//!
//! let catalog = catalog::load(json).unwrap();
//! assert_eq!(catalog.models[0].sensors[0].friendly_name, "Efficiency Core 1");
//! ```

mod types;
mod validation;


use std::path::{Path, PathBuf};

pub use types::*;
pub use validation::{load, validate, ValidationError};

use crate::error::Result;

/// The only schema revision this crate understands
pub const SUPPORTED_SCHEMA_VERSION: i64 = 1;

/// File name looked up in the configuration directory for a user catalog
pub const OVERRIDE_FILE_NAME: &str = "sensor_catalog.json";

/// Catalog shipped with the crate
const BUNDLED_CATALOG: &str = include_str!("../../resources/sensor_catalog.json");

/// Where the active catalog came from
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogOrigin {
    Override(PathBuf),
    Bundled,
    /// No usable catalog; readings are published under their raw keys
    Passthrough,
}

/// Read and validate a catalog file
pub fn load_file(path: &Path) -> Result<SensorCatalog> {
    let bytes = std::fs::read(path)?;
    Ok(load(&bytes)?)
}

/// The catalog compiled into the crate
pub fn bundled() -> Result<SensorCatalog> {
    Ok(load(BUNDLED_CATALOG.as_bytes())?)
}

/// Pick the active catalog.
///
/// A user override at `override_path` wins over the bundled catalog. An
/// override that exists but fails to load is not papered over with the
/// bundled one: the result is passthrough mode, and monitoring continues.
pub fn resolve(override_path: Option<&Path>) -> (Option<SensorCatalog>, CatalogOrigin) {
    if let Some(path) = override_path.filter(|p| p.is_file()) {
        return match load_file(path) {
            Ok(catalog) => {
                tracing::info!(path = %path.display(), models = catalog.models.len(), "using sensor catalog override");
                (Some(catalog), CatalogOrigin::Override(path.to_path_buf()))
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "sensor catalog override rejected, publishing raw sensors");
                (None, CatalogOrigin::Passthrough)
            },
        };
    }

    match bundled() {
        Ok(catalog) => {
            tracing::debug!(models = catalog.models.len(), "using bundled sensor catalog");
            (Some(catalog), CatalogOrigin::Bundled)
        },
        Err(e) => {
            tracing::warn!(error = %e, "bundled sensor catalog rejected, publishing raw sensors");
            (None, CatalogOrigin::Passthrough)
        },
    }
}
