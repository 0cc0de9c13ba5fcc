//! Adaptive explicit Runge-Kutta schemes delegated to `ode_solvers`.
//!
//! The `(n_ode, n_instances)` state is flattened into a single
//! `nalgebra::DVector` and handed to a general-purpose solver, which
//! controls its own sub-steps inside each accepted driver step. The
//! derivative callback rebuilds a trial snapshot, refreshes the state
//! variables on it and evaluates the ODE equations; it is reentrant and
//! never touches the driver's persisted state.

use nalgebra::DVector;
use ndarray::Array1;
use ode_solvers::{Dop853, Dopri5, System};

use crate::errors::{MacrodynError, MacrodynResult};
use crate::evaluator::Evaluator;
use crate::field::{FloatValue, Time};
use crate::state::Snapshot;

use super::SteppingScheme;

/// Tolerances for the adaptive step-size controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveOptions {
    pub rtol: FloatValue,
    pub atol: FloatValue,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Dopri5,
    Dop853,
}

/// An adaptive scheme advancing one accepted driver step per call.
pub(super) struct AdaptiveRk {
    method: Method,
    options: AdaptiveOptions,
}

impl AdaptiveRk {
    pub(super) fn dopri5(options: AdaptiveOptions) -> Self {
        Self {
            method: Method::Dopri5,
            options,
        }
    }

    pub(super) fn dop853(options: AdaptiveOptions) -> Self {
        Self {
            method: Method::Dop853,
            options,
        }
    }
}

/// The flattened ODE system handed to `ode_solvers`.
///
/// The time field is part of the integrated state (unit derivative), so the
/// solver's own `x` is only used for step control.
struct FlatOdeSystem<'a> {
    evaluator: &'a Evaluator<'a>,
    template: Snapshot,
    instances: usize,
}

impl System<Time, DVector<FloatValue>> for FlatOdeSystem<'_> {
    fn system(&self, _x: Time, y: &DVector<FloatValue>, dy: &mut DVector<FloatValue>) {
        let ode = &self.evaluator.order().ode;
        let nx = self.instances;

        let mut trial = self.template.clone();
        for (i, name) in ode.iter().enumerate() {
            let values = y.as_slice()[i * nx..(i + 1) * nx].to_vec();
            trial.set(name, Array1::from_vec(values));
        }

        self.evaluator.evaluate_state_vars(&mut trial);
        let derivatives = self.evaluator.evaluate_ode_derivatives(&trial);
        for (i, derivative) in derivatives.iter().enumerate() {
            for (j, value) in derivative.iter().enumerate() {
                dy[i * nx + j] = *value;
            }
        }
    }
}

impl SteppingScheme for AdaptiveRk {
    fn advance(
        &self,
        evaluator: &Evaluator,
        snapshot: &mut Snapshot,
        dt: Time,
    ) -> MacrodynResult<()> {
        let ode = evaluator.order().ode.clone();
        let nx = snapshot.instances();

        let mut y0 = DVector::zeros(ode.len() * nx);
        for (i, name) in ode.iter().enumerate() {
            let value = snapshot.get(name).expect("ODE field present in snapshot");
            for (j, v) in value.iter().enumerate() {
                y0[i * nx + j] = *v;
            }
        }

        let t = snapshot.time();
        let t_end = t + dt;
        let system = FlatOdeSystem {
            evaluator,
            template: snapshot.clone(),
            instances: nx,
        };

        let y_end = match self.method {
            Method::Dopri5 => {
                let mut stepper = Dopri5::new(
                    system,
                    t,
                    t_end,
                    dt,
                    y0,
                    self.options.rtol,
                    self.options.atol,
                );
                stepper
                    .integrate()
                    .map_err(|e| MacrodynError::SolverFailure(e.to_string()))?;
                last_state(stepper.results().get())?
            }
            Method::Dop853 => {
                let mut stepper = Dop853::new(
                    system,
                    t,
                    t_end,
                    dt,
                    y0,
                    self.options.rtol,
                    self.options.atol,
                );
                stepper
                    .integrate()
                    .map_err(|e| MacrodynError::SolverFailure(e.to_string()))?;
                last_state(stepper.results().get())?
            }
        };

        for (i, name) in ode.iter().enumerate() {
            let values = y_end.as_slice()[i * nx..(i + 1) * nx].to_vec();
            snapshot.set(name, Array1::from_vec(values));
        }
        Ok(())
    }
}

fn last_state(
    results: (&Vec<Time>, &Vec<DVector<FloatValue>>),
) -> MacrodynResult<DVector<FloatValue>> {
    results
        .1
        .last()
        .cloned()
        .ok_or_else(|| MacrodynError::SolverFailure("solver produced no output".to_string()))
}
