//! The hub: the user-facing composition of registry, resolver, evaluator
//! and integrator for one model.

use ndarray::Array1;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::catalog::{ModelCatalog, ModelDefinition, Preset};
use crate::errors::{MacrodynError, MacrodynResult};
use crate::evaluator::Evaluator;
use crate::field::{FieldKind, FieldValue, FloatValue, Time};
use crate::integrator::{integrate, Scheme, Verbosity};
use crate::registry::FieldRegistry;
use crate::resolver::{resolve, EvaluationOrder};
use crate::results::{FieldFilter, RunResult};
use crate::state::Snapshot;

/// One configured model instance: fields, initial values, and the results
/// of the most recent run.
///
/// Each hub owns its registry, state and results exclusively. Construction
/// deep-copies all numeric values out of the definition, so two hubs built
/// from the same definition can never observe each other's mutations.
#[derive(Debug)]
pub struct Hub {
    registry: FieldRegistry,
    order: EvaluationOrder,
    presets: std::collections::BTreeMap<String, Preset>,
    description: String,
    state: Snapshot,
    instances: usize,
    result: Option<RunResult>,
}

impl Hub {
    /// Build a hub from a model definition.
    ///
    /// Registers every field, seals the registry, resolves the evaluation
    /// order and materialises the initial state from the declared defaults.
    /// Any structural problem in the definition surfaces here, never at run
    /// time.
    pub fn new(definition: &ModelDefinition) -> MacrodynResult<Self> {
        let mut registry = FieldRegistry::new();
        for field in &definition.fields {
            registry.register(field.clone())?;
        }
        registry.seal()?;
        let order = resolve(&registry)?;

        let instances = 1;
        let mut state = Snapshot::new(instances);
        for field in registry.iter() {
            state.set(&field.name, field.default.to_array(&field.name, instances)?);
        }
        state.set_time(0.0);

        Ok(Self {
            registry,
            order,
            presets: definition.presets.clone(),
            description: definition.description.clone(),
            state,
            instances,
            result: None,
        })
    }

    /// Build a hub for a catalogued model, optionally applying a preset and
    /// a map of field overrides (in that order).
    pub fn from_catalog(
        catalog: &ModelCatalog,
        model: &str,
        preset: Option<&str>,
        overrides: Option<&HashMap<String, FieldValue>>,
    ) -> MacrodynResult<Self> {
        let definition = catalog.definition(model)?;
        let mut hub = Hub::new(&definition)?;
        if let Some(name) = preset {
            hub.load_preset(name)?;
        }
        if let Some(overrides) = overrides {
            for (name, value) in overrides {
                hub.set_field(name, value.clone())?;
            }
        }
        Ok(hub)
    }

    /// Apply a named preset from the model definition.
    pub fn load_preset(&mut self, name: &str) -> MacrodynResult<()> {
        let preset = self
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| MacrodynError::UnknownPreset(name.to_string()))?;
        for (field, value) in &preset.fields {
            self.set_field(field, value.clone())?;
        }
        Ok(())
    }

    /// Override a single field's value.
    ///
    /// Parameters and ODE initial conditions are settable; state variables
    /// are derived and are not ([`MacrodynError::FieldNotSettable`]).
    /// Scalars broadcast across the instance axis; vectors must match the
    /// configured instance count. Stored results are never touched.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) -> MacrodynResult<()> {
        let field = self
            .registry
            .get(name)
            .ok_or_else(|| MacrodynError::UnknownField(name.to_string()))?;
        if field.kind == FieldKind::StateVar {
            return Err(MacrodynError::FieldNotSettable {
                name: name.to_string(),
                kind: field.kind,
            });
        }

        let value = value.into().to_array(name, self.instances)?;
        self.state.set(name, value);
        Ok(())
    }

    /// Resize the parallel-instance axis.
    ///
    /// Fields currently holding a single shared value broadcast to the new
    /// count; fields already holding per-instance values must match it.
    pub fn set_instances(&mut self, instances: usize) -> MacrodynResult<()> {
        if instances == 0 {
            return Err(MacrodynError::InstanceCount);
        }
        if instances == self.instances {
            return Ok(());
        }

        let mut resized = Snapshot::new(instances);
        for field in self.registry.iter() {
            let current = self
                .state
                .get(&field.name)
                .expect("hub state holds every registered field");
            let value = if field.kind == FieldKind::StateVar {
                // derived fields are recomputed at run time
                Array1::from_elem(instances, FloatValue::NAN)
            } else if current.len() == instances {
                current.clone()
            } else if current.len() == 1 || all_equal(current) {
                Array1::from_elem(instances, current[0])
            } else {
                return Err(MacrodynError::ShapeMismatch {
                    field: field.name.clone(),
                    expected: instances,
                    got: current.len(),
                });
            };
            resized.set(&field.name, value);
        }

        self.state = resized;
        self.instances = instances;
        Ok(())
    }

    /// Integrate the model and store the resulting time series.
    ///
    /// On [`MacrodynError::NonFiniteState`] the partial result up to the
    /// last good step is stored before the error is returned.
    pub fn run(
        &mut self,
        scheme: Scheme,
        step_size: Time,
        steps: usize,
        verbosity: Verbosity,
    ) -> MacrodynResult<()> {
        let evaluator = Evaluator::new(&self.registry, &self.order)?;
        let mut snapshot = self.state.clone();
        let mut result = RunResult::new(&self.registry, steps, self.instances);

        let outcome = integrate(
            &evaluator,
            &mut snapshot,
            scheme,
            step_size,
            steps,
            verbosity,
            &mut result,
        );

        // Keep whatever was recorded, including the truncated prefix of an
        // aborted run, but not the empty shell of a misconfigured one.
        match &outcome {
            Ok(()) => self.result = Some(result),
            Err(e) if !result.is_empty() => {
                log::warn!("run aborted after {} recorded steps: {}", result.len(), e);
                self.result = Some(result);
            }
            Err(_) => {}
        }
        outcome
    }

    /// [`Hub::run`] with the scheme selected by identifier.
    ///
    /// Fails with [`MacrodynError::UnknownScheme`] for an unrecognised
    /// identifier, before anything else is touched.
    pub fn run_named(
        &mut self,
        scheme: &str,
        step_size: Time,
        steps: usize,
        verbosity: Verbosity,
    ) -> MacrodynResult<()> {
        self.run(scheme.parse()?, step_size, steps, verbosity)
    }

    /// A copy of the stored run result restricted to `filter`.
    pub fn get_results(&self, filter: &FieldFilter) -> MacrodynResult<RunResult> {
        self.result
            .as_ref()
            .ok_or(MacrodynError::ResultsNotAvailable)?
            .filtered(filter)
    }

    /// The configured (pre-run) value of a field.
    pub fn value(&self, name: &str) -> MacrodynResult<&Array1<FloatValue>> {
        if !self.registry.contains(name) {
            return Err(MacrodynError::UnknownField(name.to_string()));
        }
        Ok(self
            .state
            .get(name)
            .expect("hub state holds every registered field"))
    }

    /// Number of parallel instances configured for the next run.
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// The resolved evaluation order.
    pub fn order(&self) -> &EvaluationOrder {
        &self.order
    }

    /// The model description this hub was built from.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// A printable table of every field: kind, current value, unit and
    /// description.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        writeln!(out, "{}", self.description).unwrap();
        writeln!(out, "instances: {}", self.instances).unwrap();
        for field in self.registry.iter() {
            let value = self
                .state
                .get(&field.name)
                .expect("hub state holds every registered field");
            let shown = if field.kind == FieldKind::StateVar {
                "derived".to_string()
            } else if all_equal(value) {
                format!("{}", value[0])
            } else {
                format!("{} values", value.len())
            };
            writeln!(
                out,
                "  {:12} {:14} {:>12}  {:8} {}",
                field.name,
                field.kind.to_string(),
                shown,
                field.unit,
                field.description
            )
            .unwrap();
        }
        out
    }
}

fn all_equal(value: &Array1<FloatValue>) -> bool {
    value.iter().all(|v| *v == value[0])
}
