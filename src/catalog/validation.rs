use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;

use super::types::SensorCatalog;
use super::SUPPORTED_SCHEMA_VERSION;
use crate::router::compare_version;

/// Reasons a catalog is rejected as a whole
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed catalog: {0}")]
    Malformed(String),

    #[error("unsupported schema version {0}")]
    UnsupportedSchemaVersion(i64),

    #[error("model #{index} has an empty modelIdentifier")]
    EmptyModelIdentifier { index: usize },

    #[error("model {model}: osMin {os_min} is newer than osMax {os_max}")]
    InvertedOsRange { model: String, os_min: String, os_max: String },

    #[error("model {model}: sensor #{index} has an empty id")]
    EmptySensorId { model: String, index: usize },

    #[error("model {model}: sensor {id} has an empty friendlyName")]
    EmptyFriendlyName { model: String, id: String },

    #[error("duplicate sensor {id} for model {model}")]
    DuplicateSensor { model: String, id: String },

    #[error("model {model}: sensor {id} has clampMin {min} above clampMax {max}")]
    InvertedClamp { model: String, id: String, min: f64, max: f64 },

    #[error("model {model}: sensor {id} has smoothing {value} outside [0, 1]")]
    SmoothingOutOfRange { model: String, id: String, value: f64 },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaHeader {
    schema_version: i64,
}

/// Decode and validate a catalog document.
///
/// The schema version is checked before the body is decoded, so a document
/// from a future schema is reported as unsupported rather than malformed.
/// Any violation rejects the whole document.
pub fn load(bytes: &[u8]) -> Result<SensorCatalog, ValidationError> {
    let header: SchemaHeader =
        serde_json::from_slice(bytes).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if header.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedSchemaVersion(header.schema_version));
    }

    let catalog: SensorCatalog =
        serde_json::from_slice(bytes).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    validate(&catalog)?;
    Ok(catalog)
}

/// Check every catalog invariant, reporting the first violation found.
///
/// Checks run pass by pass in a fixed order: schema version, model
/// identifiers and OS ranges, sensor ids and names, composite-key
/// uniqueness, clamp bounds, smoothing range.
pub fn validate(catalog: &SensorCatalog) -> Result<(), ValidationError> {
    if catalog.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(ValidationError::UnsupportedSchemaVersion(catalog.schema_version));
    }

    for (index, model) in catalog.models.iter().enumerate() {
        if model.model_identifier.is_empty() {
            return Err(ValidationError::EmptyModelIdentifier { index });
        }
        if let (Some(os_min), Some(os_max)) = (&model.os_min, &model.os_max) {
            if compare_version(os_min, os_max) == Ordering::Greater {
                return Err(ValidationError::InvertedOsRange {
                    model: model.model_identifier.clone(),
                    os_min: os_min.clone(),
                    os_max: os_max.clone(),
                });
            }
        }
    }

    for model in &catalog.models {
        for (index, sensor) in model.sensors.iter().enumerate() {
            if sensor.id.is_empty() {
                return Err(ValidationError::EmptySensorId { model: model.model_identifier.clone(), index });
            }
            if sensor.friendly_name.is_empty() {
                return Err(ValidationError::EmptyFriendlyName {
                    model: model.model_identifier.clone(),
                    id: sensor.id.clone(),
                });
            }
        }
    }

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    for model in &catalog.models {
        for sensor in &model.sensors {
            if !seen.insert((model.model_identifier.as_str(), sensor.id.as_str())) {
                return Err(ValidationError::DuplicateSensor {
                    model: model.model_identifier.clone(),
                    id: sensor.id.clone(),
                });
            }
        }
    }

    for model in &catalog.models {
        for sensor in &model.sensors {
            let Some(transform) = &sensor.transform else { continue };
            if let (Some(min), Some(max)) = (transform.clamp_min, transform.clamp_max) {
                if min > max {
                    return Err(ValidationError::InvertedClamp {
                        model: model.model_identifier.clone(),
                        id: sensor.id.clone(),
                        min,
                        max,
                    });
                }
            }
        }
    }

    for model in &catalog.models {
        for sensor in &model.sensors {
            let Some(value) = sensor.transform.as_ref().and_then(|t| t.smoothing) else { continue };
            // NaN fails the range check as well
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::SmoothingOutOfRange {
                    model: model.model_identifier.clone(),
                    id: sensor.id.clone(),
                    value,
                });
            }
        }
    }

    Ok(())
}
