//! Per-step evaluation of state variables and ODE derivatives.

use ndarray::Array1;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::field::{Args, FloatValue};
use crate::registry::FieldRegistry;
use crate::resolver::EvaluationOrder;
use crate::state::Snapshot;

/// Evaluates a model's equations against a snapshot.
///
/// The evaluator borrows a sealed registry together with its resolved
/// order. It owns no state of its own: both entry points are pure with
/// respect to everything except the snapshot passed in, so stepping schemes
/// may call them on trial snapshots as often as they need.
#[derive(Debug)]
pub struct Evaluator<'a> {
    registry: &'a FieldRegistry,
    order: &'a EvaluationOrder,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator for a sealed registry and its resolved order.
    pub fn new(registry: &'a FieldRegistry, order: &'a EvaluationOrder) -> MacrodynResult<Self> {
        if !registry.is_sealed() {
            return Err(MacrodynError::NotSealed);
        }
        Ok(Self { registry, order })
    }

    /// Recompute every state variable in dependency order.
    ///
    /// Each result is written back into the snapshot before the next state
    /// variable is evaluated, so after this call every state variable is
    /// consistent with the snapshot's current parameter and ODE values and
    /// with all state variables earlier in the order, never with a stale
    /// value from a previous step.
    pub fn evaluate_state_vars(&self, snapshot: &mut Snapshot) {
        for name in &self.order.state_vars {
            let field = self
                .registry
                .get(name)
                .expect("resolved state variable is registered");
            let equation = field
                .equation
                .as_ref()
                .expect("state variables carry an equation");

            let value = {
                let args = Args::new(snapshot, &field.dependencies);
                equation(&args)
            };
            debug_assert_eq!(
                value.len(),
                snapshot.instances(),
                "equation for '{}' changed the instance length",
                name
            );
            snapshot.set(name, value);
        }
    }

    /// Compute the time derivative of every ODE field.
    ///
    /// The returned arrays are aligned with [`EvaluationOrder::ode`] and
    /// shaped like the corresponding field values. Equations may read any
    /// field, including state variables refreshed by
    /// [`Evaluator::evaluate_state_vars`]; the snapshot itself is left
    /// untouched.
    pub fn evaluate_ode_derivatives(&self, snapshot: &Snapshot) -> Vec<Array1<FloatValue>> {
        self.order
            .ode
            .iter()
            .map(|name| {
                let field = self.registry.get(name).expect("ODE field is registered");
                let equation = field
                    .equation
                    .as_ref()
                    .expect("ODE fields carry an equation");
                let args = Args::new(snapshot, &field.dependencies);
                let derivative = equation(&args);
                debug_assert_eq!(
                    derivative.len(),
                    snapshot.instances(),
                    "derivative for '{}' changed the instance length",
                    name
                );
                derivative
            })
            .collect()
    }

    /// The evaluation order this evaluator follows.
    pub fn order(&self) -> &EvaluationOrder {
        self.order
    }

    /// The registry this evaluator reads field definitions from.
    pub fn registry(&self) -> &FieldRegistry {
        self.registry
    }
}
