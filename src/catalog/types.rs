use serde::{Deserialize, Serialize};

/// Versioned description of which sensors exist on which Mac models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorCatalog {
    /// Schema revision; only [`SUPPORTED_SCHEMA_VERSION`](super::SUPPORTED_SCHEMA_VERSION) is accepted
    pub schema_version: i64,
    /// One entry per model identifier and OS range
    pub models: Vec<ModelCatalog>,
}

/// One model's slice of the catalog, optionally bounded to an OS range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCatalog {
    /// Hardware model identifier such as `Mac14,2`
    pub model_identifier: String,
    /// Lowest OS version (inclusive) this entry applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_min: Option<String>,
    /// Highest OS version (inclusive) this entry applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_max: Option<String>,
    #[serde(default)]
    pub sensors: Vec<SensorDefinition>,
}

/// A single cataloged sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorDefinition {
    pub id: String,
    /// Name the reading is published under
    pub friendly_name: String,
    pub unit: SensorUnit,
    /// Logical groups; the first one is checked against feature flags
    #[serde(default)]
    pub groups: Vec<String>,
    pub source: SensorSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl SensorDefinition {
    /// The first group, which decides feature-flag visibility
    pub fn primary_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }
}

/// Physical unit of a sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorUnit {
    Celsius,
    Rpm,
    Watt,
    Percent,
    Volt,
    Amp,
}

impl SensorUnit {
    /// Range of values a healthy sensor of this unit can report
    pub fn plausible_range(self) -> (f64, f64) {
        match self {
            SensorUnit::Celsius => (-40.0, 150.0),
            SensorUnit::Rpm => (0.0, 12_000.0),
            SensorUnit::Watt => (0.0, 500.0),
            SensorUnit::Percent => (0.0, 100.0),
            SensorUnit::Volt => (0.0, 30.0),
            SensorUnit::Amp => (-30.0, 30.0),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            SensorUnit::Celsius => "°C",
            SensorUnit::Rpm => "rpm",
            SensorUnit::Watt => "W",
            SensorUnit::Percent => "%",
            SensorUnit::Volt => "V",
            SensorUnit::Amp => "A",
        }
    }
}

/// Where a sensor's raw value comes from.
///
/// Serialized with an explicit `kind` discriminator:
///
/// ```json
/// { "kind": "ioReport", "group": "Energy Model", "channel": "GPU" }
/// { "kind": "smc", "key": "TC0E" }
/// { "kind": "ioHwSensor", "name": "PMU tdie1" }
/// { "kind": "derived", "dependencies": ["a", "b"], "formula": "max" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SensorSource {
    IoReport {
        /// Logical grouping; kept as metadata and not part of the raw lookup key
        group: String,
        channel: String,
    },
    Smc {
        key: String,
    },
    IoHwSensor {
        name: String,
    },
    /// Reserved; never resolved at read time
    Derived {
        #[serde(default)]
        dependencies: Vec<String>,
        formula: String,
    },
}

/// Discriminant of [`SensorSource`] used for ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    IoReport,
    Smc,
    IoHwSensor,
    Derived,
}

impl SensorSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            SensorSource::IoReport { .. } => SourceKind::IoReport,
            SensorSource::Smc { .. } => SourceKind::Smc,
            SensorSource::IoHwSensor { .. } => SourceKind::IoHwSensor,
            SensorSource::Derived { .. } => SourceKind::Derived,
        }
    }

    /// Key under which raw adapters publish this sensor.
    ///
    /// Raw adapters key purely by sensor name, so an IOReport source resolves
    /// through its channel alone. Derived sources have no raw key.
    pub fn raw_lookup_key(&self) -> Option<&str> {
        match self {
            SensorSource::IoReport { channel, .. } => Some(channel),
            SensorSource::Smc { key } => Some(key),
            SensorSource::IoHwSensor { name } => Some(name),
            SensorSource::Derived { .. } => None,
        }
    }
}

/// Normalization applied to a raw value before it is published
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clamp_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clamp_max: Option<f64>,
    /// EWMA weight of the newest sample, in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoothing: Option<f64>,
}
