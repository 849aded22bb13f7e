use darwin_telemetry::catalog::{
    ModelCatalog, SensorCatalog, SensorDefinition, SensorSource, SensorUnit, Transform, SUPPORTED_SCHEMA_VERSION,
};

/// Builder for creating SensorCatalog test instances
pub struct CatalogBuilder {
    schema_version: i64,
    models: Vec<ModelCatalog>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self { schema_version: SUPPORTED_SCHEMA_VERSION, models: Vec::new() }
    }

    pub fn with_schema_version(mut self, version: i64) -> Self {
        self.schema_version = version;
        self
    }

    pub fn with_model(mut self, model: ModelBuilder) -> Self {
        self.models.push(model.build());
        self
    }

    pub fn build(self) -> SensorCatalog {
        SensorCatalog { schema_version: self.schema_version, models: self.models }
    }

    pub fn to_json(self) -> String {
        serde_json::to_string_pretty(&self.build()).unwrap()
    }
}

/// Builder for one model entry
pub struct ModelBuilder {
    model: ModelCatalog,
}

impl ModelBuilder {
    pub fn new(model_identifier: &str) -> Self {
        Self {
            model: ModelCatalog {
                model_identifier: model_identifier.to_string(),
                os_min: None,
                os_max: None,
                sensors: Vec::new(),
            },
        }
    }

    pub fn with_os_range(mut self, os_min: Option<&str>, os_max: Option<&str>) -> Self {
        self.model.os_min = os_min.map(str::to_string);
        self.model.os_max = os_max.map(str::to_string);
        self
    }

    pub fn with_smc(self, id: &str, friendly_name: &str, group: &str, key: &str) -> Self {
        self.with_sensor(id, friendly_name, SensorUnit::Celsius, group, SensorSource::Smc { key: key.to_string() }, None)
    }

    pub fn with_fan(self, id: &str, friendly_name: &str, key: &str) -> Self {
        let transform = Transform { clamp_min: Some(0.0), ..Transform::default() };
        self.with_sensor(id, friendly_name, SensorUnit::Rpm, "fans", SensorSource::Smc { key: key.to_string() }, Some(transform))
    }

    pub fn with_sensor(
        mut self,
        id: &str,
        friendly_name: &str,
        unit: SensorUnit,
        group: &str,
        source: SensorSource,
        transform: Option<Transform>,
    ) -> Self {
        self.model.sensors.push(SensorDefinition {
            id: id.to_string(),
            friendly_name: friendly_name.to_string(),
            unit,
            groups: vec![group.to_string()],
            source,
            transform,
        });
        self
    }

    pub fn build(self) -> ModelCatalog {
        self.model
    }
}
