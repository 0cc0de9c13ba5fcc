//! Field declarations: the atomic named quantities a model is made of.
//!
//! A model is a closed set of named fields. Each field is one of three
//! kinds:
//!
//! * [`FieldKind::Parameter`]: a constant supplied by the user, with no
//!   governing equation.
//! * [`FieldKind::Ode`]: a state integrated over time; its equation
//!   computes the time derivative.
//! * [`FieldKind::StateVar`]: a value recomputed at every step as a pure
//!   function of other fields' current values, with no memory of its own.
//!
//! Equations are plain closures over an explicit named-argument record
//! ([`Args`]). Dependencies are declared as data at registration time; the
//! resolver consumes the declared list rather than inspecting the closure.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::state::Snapshot;

/// The numeric type used for all field values.
pub type FloatValue = f64;

/// The numeric type used for simulation time.
pub type Time = f64;

/// Name of the implicit time field present in every registry.
///
/// Time is carried as an ordinary ODE field with unit derivative, so
/// stepping schemes advance it exactly alongside the model state and
/// equations may declare it as a dependency like any other field.
pub const TIME_FIELD: &str = "time";

/// The kind of equation governing a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// A constant value with no governing equation.
    Parameter,
    /// A state variable integrated over time; the equation computes `d/dt`.
    Ode,
    /// A derived value recomputed from the current snapshot at every step.
    StateVar,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Parameter => write!(f, "parameter"),
            FieldKind::Ode => write!(f, "ODE"),
            FieldKind::StateVar => write!(f, "state variable"),
        }
    }
}

/// A literal field value as supplied by presets and overrides.
///
/// Scalars broadcast across the parallel-instance axis; vectors must match
/// the configured instance count exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(FloatValue),
    Vector(Vec<FloatValue>),
}

impl FieldValue {
    /// Materialise the literal as a per-instance array of length `instances`.
    pub fn to_array(&self, name: &str, instances: usize) -> MacrodynResult<Array1<FloatValue>> {
        match self {
            FieldValue::Scalar(v) => Ok(Array1::from_elem(instances, *v)),
            FieldValue::Vector(values) => {
                if values.len() != instances {
                    return Err(MacrodynError::ShapeMismatch {
                        field: name.to_string(),
                        expected: instances,
                        got: values.len(),
                    });
                }
                Ok(Array1::from_vec(values.clone()))
            }
        }
    }
}

impl From<FloatValue> for FieldValue {
    fn from(value: FloatValue) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Vec<FloatValue>> for FieldValue {
    fn from(values: Vec<FloatValue>) -> Self {
        FieldValue::Vector(values)
    }
}

/// Named-argument record passed to equation closures.
///
/// Provides read access to the current value of each *declared* dependency.
/// All arithmetic on the returned arrays broadcasts elementwise across the
/// leading parallel-instance axis.
pub struct Args<'a> {
    snapshot: &'a Snapshot,
    declared: &'a [String],
}

impl<'a> Args<'a> {
    pub(crate) fn new(snapshot: &'a Snapshot, declared: &'a [String]) -> Self {
        Self { snapshot, declared }
    }

    /// Current value of a declared dependency.
    ///
    /// # Panics
    /// Panics if `name` was not declared as a dependency of the field being
    /// evaluated. Declared names are guaranteed to resolve by the registry's
    /// seal-time validation, so a panic here always indicates an equation
    /// reading a field it did not declare.
    pub fn get(&self, name: &str) -> &Array1<FloatValue> {
        assert!(
            self.declared.iter().any(|d| d == name),
            "equation read undeclared dependency '{}'",
            name
        );
        self.snapshot
            .get(name)
            .expect("declared dependency missing from snapshot")
    }

    /// The current simulation time.
    pub fn time(&self) -> Time {
        self.snapshot.time()
    }

    /// Number of parallel instances in the current run.
    pub fn instances(&self) -> usize {
        self.snapshot.instances()
    }
}

/// An equation: a pure function of the declared dependencies.
///
/// For ODE fields the result is the time derivative of the field; for state
/// variables it is the field's value. The result must preserve the
/// parallel-instance length of its inputs.
pub type EquationFn = Arc<dyn Fn(&Args) -> Array1<FloatValue> + Send + Sync>;

/// Declaration of a single model field.
///
/// Built with [`FieldDefinition::parameter`], [`FieldDefinition::ode`] or
/// [`FieldDefinition::state_var`], then optionally annotated with unit,
/// description and group metadata. The metadata is documentation only,
/// except for the group tag which the result filter can match on.
#[derive(Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    /// Default value: the parameter value or ODE initial condition.
    /// State variables are derived and start out as NaN.
    pub default: FieldValue,
    pub equation: Option<EquationFn>,
    /// Names of the fields the equation reads, in declaration order.
    pub dependencies: Vec<String>,
    pub unit: String,
    pub description: String,
    pub group: String,
}

impl FieldDefinition {
    /// Declare a constant parameter.
    pub fn parameter(name: &str, default: impl Into<FieldValue>) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Parameter,
            default: default.into(),
            equation: None,
            dependencies: vec![],
            unit: String::new(),
            description: String::new(),
            group: String::new(),
        }
    }

    /// Declare an ODE state with its initial condition and derivative
    /// equation.
    pub fn ode(
        name: &str,
        initial: impl Into<FieldValue>,
        dependencies: &[&str],
        equation: impl Fn(&Args) -> Array1<FloatValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Ode,
            default: initial.into(),
            equation: Some(Arc::new(equation)),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            unit: String::new(),
            description: String::new(),
            group: String::new(),
        }
    }

    /// Declare a state variable computed from other fields at every step.
    pub fn state_var(
        name: &str,
        dependencies: &[&str],
        equation: impl Fn(&Args) -> Array1<FloatValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::StateVar,
            default: FieldValue::Scalar(FloatValue::NAN),
            equation: Some(Arc::new(equation)),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            unit: String::new(),
            description: String::new(),
            group: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("dependencies", &self.dependencies)
            .field("unit", &self.unit)
            .field("group", &self.group)
            .finish()
    }
}
