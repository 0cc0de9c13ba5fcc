//! Model definitions, presets and the model catalog.
//!
//! A [`ModelDefinition`] is the external collaborator format consumed by
//! the engine: a set of field declarations plus named presets. The
//! [`ModelCatalog`] is an explicit, passed-in enumeration of available
//! models; there is no process-wide registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::field::{FieldDefinition, FieldValue};

/// A named bundle of field values for reproducible runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Preset {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Parse a preset from TOML text.
    ///
    /// ```toml
    /// description = "near the equilibrium point"
    ///
    /// [fields]
    /// lambda = 0.95
    /// omega = [0.8, 0.85, 0.9]
    /// ```
    pub fn from_toml_str(text: &str) -> MacrodynResult<Self> {
        toml::from_str(text).map_err(|e| MacrodynError::PresetParse(e.to_string()))
    }
}

/// A complete model description: fields plus presets.
#[derive(Clone)]
pub struct ModelDefinition {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldDefinition>,
    pub presets: BTreeMap<String, Preset>,
}

impl ModelDefinition {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            fields: Vec::new(),
            presets: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_preset(mut self, name: &str, preset: Preset) -> Self {
        self.presets.insert(name.to_string(), preset);
        self
    }

    pub fn preset(&self, name: &str) -> MacrodynResult<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| MacrodynError::UnknownPreset(name.to_string()))
    }
}

impl std::fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("presets", &self.presets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a model definition on demand.
pub type ModelBuilderFn = fn() -> ModelDefinition;

/// An explicit catalog of available models.
///
/// Callers construct a catalog, register builders into it and pass it to
/// whoever needs to enumerate or instantiate models.
#[derive(Default)]
pub struct ModelCatalog {
    builders: BTreeMap<String, ModelBuilderFn>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model builder under a name, replacing any previous entry.
    pub fn register(&mut self, name: &str, builder: ModelBuilderFn) -> &mut Self {
        if self.builders.insert(name.to_string(), builder).is_some() {
            log::warn!("model '{}' was re-registered in the catalog", name);
        }
        self
    }

    /// Names of all registered models, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.builders.keys().map(|k| k.as_str()).collect()
    }

    /// Build the definition of a registered model.
    pub fn definition(&self, name: &str) -> MacrodynResult<ModelDefinition> {
        self.builders
            .get(name)
            .map(|builder| builder())
            .ok_or_else(|| MacrodynError::UnknownModel(name.to_string()))
    }

    /// A human-readable description of one model: its blurb, fields and
    /// presets.
    pub fn describe(&self, name: &str) -> MacrodynResult<String> {
        let definition = self.definition(name)?;
        let mut out = String::new();
        writeln!(out, "{}: {}", definition.name, definition.description).unwrap();
        for field in &definition.fields {
            writeln!(
                out,
                "  {:12} {:14} {}",
                field.name, field.kind.to_string(), field.description
            )
            .unwrap();
        }
        if !definition.presets.is_empty() {
            writeln!(
                out,
                "  presets: {}",
                definition
                    .presets
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            )
            .unwrap();
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn toy_model() -> ModelDefinition {
        ModelDefinition::new("toy", "a single decaying state")
            .with_field(FieldDefinition::parameter("rate", 1.0))
            .with_field(FieldDefinition::ode("x", 1.0, &["x", "rate"], |args| {
                args.get("rate") * -1.0 * args.get("x")
            }))
            .with_preset("fast", Preset::new("fast decay").with_field("rate", 5.0))
    }

    fn other_model() -> ModelDefinition {
        ModelDefinition::new("other", "").with_field(FieldDefinition::state_var(
            "one",
            &[],
            |args| Array1::from_elem(args.instances(), 1.0),
        ))
    }

    #[test]
    fn catalog_lists_sorted_names() {
        let mut catalog = ModelCatalog::new();
        catalog.register("toy", toy_model);
        catalog.register("other", other_model);
        assert_eq!(catalog.list(), vec!["other", "toy"]);
    }

    #[test]
    fn unknown_model_is_an_error() {
        let catalog = ModelCatalog::new();
        let err = catalog.definition("missing").unwrap_err();
        assert!(matches!(err, MacrodynError::UnknownModel(name) if name == "missing"));
    }

    #[test]
    fn describe_mentions_fields_and_presets() {
        let mut catalog = ModelCatalog::new();
        catalog.register("toy", toy_model);
        let text = catalog.describe("toy").unwrap();
        assert!(text.contains("a single decaying state"));
        assert!(text.contains("rate"));
        assert!(text.contains("presets: fast"));
    }

    #[test]
    fn preset_parses_from_toml() {
        let preset = Preset::from_toml_str(
            r#"
            description = "spread of initial employment rates"

            [fields]
            lambda = [0.9, 0.95]
            alpha = 0.02
            "#,
        )
        .unwrap();

        assert_eq!(
            preset.fields["lambda"],
            FieldValue::Vector(vec![0.9, 0.95])
        );
        assert_eq!(preset.fields["alpha"], FieldValue::Scalar(0.02));
    }

    #[test]
    fn malformed_preset_toml_is_reported() {
        let err = Preset::from_toml_str("fields = 3").unwrap_err();
        assert!(matches!(err, MacrodynError::PresetParse(_)));
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let model = toy_model();
        assert!(model.preset("fast").is_ok());
        let err = model.preset("slow").unwrap_err();
        assert!(matches!(err, MacrodynError::UnknownPreset(name) if name == "slow"));
    }
}
