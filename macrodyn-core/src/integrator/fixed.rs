//! Homemade fixed-step explicit Runge-Kutta schemes, vectorized across the
//! instance axis.

use ndarray::Array1;

use crate::errors::MacrodynResult;
use crate::evaluator::Evaluator;
use crate::field::{FloatValue, Time};
use crate::state::Snapshot;

use super::SteppingScheme;

/// Classic 4-stage Runge-Kutta with weights (1, 2, 2, 1) / 6.
///
/// Each stage builds a trial snapshot from the current ODE state plus the
/// stage offset, refreshes the state variables on that trial state, and
/// only then evaluates the derivatives. The time field advances exactly
/// because its derivative is one.
pub(super) struct Rk4Fixed;

impl SteppingScheme for Rk4Fixed {
    fn advance(
        &self,
        evaluator: &Evaluator,
        snapshot: &mut Snapshot,
        dt: Time,
    ) -> MacrodynResult<()> {
        let ode = &evaluator.order().ode;
        let y0: Vec<Array1<FloatValue>> = ode
            .iter()
            .map(|name| {
                snapshot
                    .get(name)
                    .expect("ODE field present in snapshot")
                    .clone()
            })
            .collect();

        // Stage 1 uses the entry snapshot, whose state variables the driver
        // keeps consistent.
        let k1 = evaluator.evaluate_ode_derivatives(snapshot);
        let k2 = stage(evaluator, snapshot, ode, &y0, &k1, dt * 0.5);
        let k3 = stage(evaluator, snapshot, ode, &y0, &k2, dt * 0.5);
        let k4 = stage(evaluator, snapshot, ode, &y0, &k3, dt);

        for (i, name) in ode.iter().enumerate() {
            let slope = &k1[i] + &(&k2[i] * 2.0) + &(&k3[i] * 2.0) + &k4[i];
            snapshot.set(name, &y0[i] + &(slope * (dt / 6.0)));
        }
        Ok(())
    }
}

/// Explicit midpoint rule (order 2).
pub(super) struct Rk2Midpoint;

impl SteppingScheme for Rk2Midpoint {
    fn advance(
        &self,
        evaluator: &Evaluator,
        snapshot: &mut Snapshot,
        dt: Time,
    ) -> MacrodynResult<()> {
        let ode = &evaluator.order().ode;
        let y0: Vec<Array1<FloatValue>> = ode
            .iter()
            .map(|name| {
                snapshot
                    .get(name)
                    .expect("ODE field present in snapshot")
                    .clone()
            })
            .collect();

        let k1 = evaluator.evaluate_ode_derivatives(snapshot);
        let k2 = stage(evaluator, snapshot, ode, &y0, &k1, dt * 0.5);

        for (i, name) in ode.iter().enumerate() {
            snapshot.set(name, &y0[i] + &(&k2[i] * dt));
        }
        Ok(())
    }
}

/// Evaluate derivatives on a trial state `y0 + offset * k`, with state
/// variables refreshed on the trial snapshot first.
fn stage(
    evaluator: &Evaluator,
    snapshot: &Snapshot,
    ode: &[String],
    y0: &[Array1<FloatValue>],
    k: &[Array1<FloatValue>],
    offset: Time,
) -> Vec<Array1<FloatValue>> {
    let mut trial = snapshot.clone();
    for (i, name) in ode.iter().enumerate() {
        trial.set(name, &y0[i] + &(&k[i] * offset));
    }
    evaluator.evaluate_state_vars(&mut trial);
    evaluator.evaluate_ode_derivatives(&trial)
}
