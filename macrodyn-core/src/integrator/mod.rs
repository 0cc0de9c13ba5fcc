//! Time integration: advancing the ODE state through interchangeable
//! stepping schemes.
//!
//! Every scheme implements [`SteppingScheme`]: advance one accepted step
//! from `t` to `t + dt`, re-running the state-variable evaluation whenever
//! it needs intermediate values consistent with an intermediate ODE state.
//! The driver dispatches on scheme identity exactly once, then loops:
//! advance, refresh state variables on the accepted state, check
//! finiteness, record.

mod adaptive;
mod fixed;

pub use adaptive::AdaptiveOptions;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::evaluator::Evaluator;
use crate::field::Time;
use crate::results::RunResult;
use crate::state::Snapshot;

/// The closed set of stepping schemes the driver accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Classic fixed-step Runge-Kutta 4, evaluated natively across the
    /// instance axis.
    Rk4,
    /// Fixed-step explicit midpoint (order 2).
    Rk2,
    /// Dormand-Prince 5(4) with adaptive step control, via `ode_solvers`.
    Dopri5,
    /// Dormand-Prince 8(5,3) with adaptive step control, via `ode_solvers`.
    Dop853,
}

impl Scheme {
    /// All selectable schemes.
    pub fn all() -> [Scheme; 4] {
        [Scheme::Rk4, Scheme::Rk2, Scheme::Dopri5, Scheme::Dop853]
    }

    fn stepper(&self) -> Box<dyn SteppingScheme> {
        match self {
            Scheme::Rk4 => Box::new(fixed::Rk4Fixed),
            Scheme::Rk2 => Box::new(fixed::Rk2Midpoint),
            Scheme::Dopri5 => Box::new(adaptive::AdaptiveRk::dopri5(AdaptiveOptions::default())),
            Scheme::Dop853 => Box::new(adaptive::AdaptiveRk::dop853(AdaptiveOptions::default())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Rk4 => "rk4",
            Scheme::Rk2 => "rk2",
            Scheme::Dopri5 => "dopri5",
            Scheme::Dop853 => "dop853",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Scheme {
    type Err = MacrodynError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rk4" => Ok(Scheme::Rk4),
            "rk2" => Ok(Scheme::Rk2),
            "dopri5" => Ok(Scheme::Dopri5),
            "dop853" => Ok(Scheme::Dop853),
            other => Err(MacrodynError::UnknownScheme(other.to_string())),
        }
    }
}

/// Progress-reporting policy for [`integrate`].
///
/// Reporting goes through `log::info!` and never alters numerical
/// results, only how often they are described.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Verbosity {
    /// No progress output.
    #[default]
    Silent,
    /// Report every `n` accepted steps.
    Steps(usize),
    /// Report at most once per the given number of wall-clock seconds.
    Seconds(f64),
}

/// A stepping scheme: advance the snapshot's ODE state by one accepted
/// step of size `dt`.
///
/// On entry the snapshot's state variables are consistent with its ODE
/// values; on success the ODE values (including the time field) are at
/// `t + dt` and the state variables are stale until the driver refreshes
/// them.
pub trait SteppingScheme {
    fn advance(
        &self,
        evaluator: &Evaluator,
        snapshot: &mut Snapshot,
        dt: Time,
    ) -> MacrodynResult<()>;
}

/// Advance the model `steps` times with fixed step size `step_size`,
/// recording every accepted state into `result`.
///
/// The initial state (after a state-variable refresh) is recorded first, so
/// a completed run holds `steps + 1` entries. If any ODE or state-variable
/// field becomes non-finite the run is aborted with
/// [`MacrodynError::NonFiniteState`]; everything recorded up to the last
/// good step remains valid in `result`.
pub fn integrate(
    evaluator: &Evaluator,
    snapshot: &mut Snapshot,
    scheme: Scheme,
    step_size: Time,
    steps: usize,
    verbosity: Verbosity,
    result: &mut RunResult,
) -> MacrodynResult<()> {
    if step_size <= 0.0 || !step_size.is_finite() {
        return Err(MacrodynError::InvalidStep(format!(
            "step size must be positive and finite, got {}",
            step_size
        )));
    }
    if steps == 0 {
        return Err(MacrodynError::InvalidStep(
            "at least one step is required".to_string(),
        ));
    }

    let stepper = scheme.stepper();
    let t0 = snapshot.time();
    let started = Instant::now();
    let mut last_report = Instant::now();

    evaluator.evaluate_state_vars(snapshot);
    check_finite(evaluator, snapshot, result)?;
    result.record(t0, snapshot);

    for step in 1..=steps {
        stepper.advance(evaluator, snapshot, step_size).map_err(|e| {
            result.finish();
            e
        })?;
        evaluator.evaluate_state_vars(snapshot);
        check_finite(evaluator, snapshot, result)?;

        // Recompute from the step index rather than accumulating, so the
        // recorded axis does not drift from summed rounding errors.
        let t = t0 + step as Time * step_size;
        result.record(t, snapshot);

        match verbosity {
            Verbosity::Silent => {}
            Verbosity::Steps(cadence) => {
                if cadence > 0 && step % cadence == 0 {
                    log::info!("step {}/{} t = {:.6}", step, steps, t);
                }
            }
            Verbosity::Seconds(interval) => {
                if last_report.elapsed().as_secs_f64() >= interval {
                    log::info!(
                        "step {}/{} t = {:.6} elapsed = {:.2}s",
                        step,
                        steps,
                        t,
                        started.elapsed().as_secs_f64()
                    );
                    last_report = Instant::now();
                }
            }
        }
    }

    result.finish();
    log::debug!(
        "integrated {} steps with {} in {:.3}s",
        steps,
        scheme,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Abort with the first non-finite ODE or state-variable field, in
/// deterministic (resolved) order.
fn check_finite(
    evaluator: &Evaluator,
    snapshot: &Snapshot,
    result: &mut RunResult,
) -> MacrodynResult<()> {
    let order = evaluator.order();
    for name in order.ode.iter().chain(order.state_vars.iter()) {
        if !snapshot.is_finite(name) {
            result.finish();
            return Err(MacrodynError::NonFiniteState {
                field: name.clone(),
                time: snapshot.time(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDefinition;
    use crate::registry::FieldRegistry;
    use crate::resolver::resolve;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn decay_registry() -> FieldRegistry {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::parameter("rate", 1.0))
            .unwrap();
        registry
            .register(FieldDefinition::ode("x", 1.0, &["x", "rate"], |args| {
                args.get("rate") * -1.0 * args.get("x")
            }))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("doubled", &["x"], |args| {
                args.get("x") * 2.0
            }))
            .unwrap();
        registry.seal().unwrap();
        registry
    }

    fn initial_snapshot(registry: &FieldRegistry, instances: usize) -> Snapshot {
        let mut snapshot = Snapshot::new(instances);
        for field in registry.iter() {
            snapshot.set(
                &field.name,
                field.default.to_array(&field.name, instances).unwrap(),
            );
        }
        snapshot.set_time(0.0);
        snapshot
    }

    fn run_decay(scheme: Scheme, step_size: Time, steps: usize) -> RunResult {
        let registry = decay_registry();
        let order = resolve(&registry).unwrap();
        let evaluator = Evaluator::new(&registry, &order).unwrap();
        let mut snapshot = initial_snapshot(&registry, 1);
        let mut result = RunResult::new(&registry, steps, 1);
        integrate(
            &evaluator,
            &mut snapshot,
            scheme,
            step_size,
            steps,
            Verbosity::Silent,
            &mut result,
        )
        .unwrap();
        result
    }

    #[test]
    fn rk4_matches_analytic_decay() {
        let result = run_decay(Scheme::Rk4, 0.01, 100);
        assert_eq!(result.len(), 101);

        let x = result.field("x").unwrap();
        let x_end = x.at(100)[0];
        assert_relative_eq!(x_end, (-1.0f64).exp(), epsilon = 1e-8);

        // state variables are recorded against the same accepted state
        let doubled = result.field("doubled").unwrap();
        assert_relative_eq!(doubled.at(100)[0], 2.0 * x_end, epsilon = 1e-12);
    }

    #[test]
    fn rk2_matches_analytic_decay_more_loosely() {
        let result = run_decay(Scheme::Rk2, 0.01, 100);
        let x_end = result.field("x").unwrap().at(100)[0];
        assert_relative_eq!(x_end, (-1.0f64).exp(), epsilon = 1e-4);
    }

    #[test]
    fn adaptive_schemes_match_analytic_decay() {
        for scheme in [Scheme::Dopri5, Scheme::Dop853] {
            let result = run_decay(scheme, 0.1, 10);
            let x_end = result.field("x").unwrap().at(10)[0];
            assert_relative_eq!(x_end, (-1.0f64).exp(), epsilon = 1e-6);
        }
    }

    #[test]
    fn time_axis_is_exact() {
        let result = run_decay(Scheme::Rk4, 0.1, 10);
        assert_relative_eq!(result.times()[10], 1.0, epsilon = 1e-12);
        // the integrated time field agrees with the driver's axis
        let time_field = result.field("time").unwrap();
        assert_relative_eq!(time_field.at(10)[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn runs_are_deterministic() {
        let first = run_decay(Scheme::Rk4, 0.01, 50);
        let second = run_decay(Scheme::Rk4, 0.01, 50);
        assert_eq!(first, second);
    }

    #[test]
    fn verbosity_never_changes_results() {
        let registry = decay_registry();
        let order = resolve(&registry).unwrap();
        let evaluator = Evaluator::new(&registry, &order).unwrap();

        let mut results = Vec::new();
        for verbosity in [Verbosity::Silent, Verbosity::Steps(1), Verbosity::Seconds(0.0)] {
            let mut snapshot = initial_snapshot(&registry, 1);
            let mut result = RunResult::new(&registry, 20, 1);
            integrate(
                &evaluator,
                &mut snapshot,
                Scheme::Rk4,
                0.05,
                20,
                verbosity,
                &mut result,
            )
            .unwrap();
            results.push(result);
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn invalid_steps_are_rejected() {
        let registry = decay_registry();
        let order = resolve(&registry).unwrap();
        let evaluator = Evaluator::new(&registry, &order).unwrap();
        let mut snapshot = initial_snapshot(&registry, 1);
        let mut result = RunResult::new(&registry, 1, 1);

        for (dt, steps) in [(0.0, 10), (-0.1, 10), (f64::NAN, 10), (0.1, 0)] {
            let err = integrate(
                &evaluator,
                &mut snapshot,
                Scheme::Rk4,
                dt,
                steps,
                Verbosity::Silent,
                &mut result,
            )
            .unwrap_err();
            assert!(matches!(err, MacrodynError::InvalidStep(_)));
        }
    }

    #[test]
    fn overflow_aborts_and_keeps_prefix() {
        // dx/dt = x^2 from a huge initial value overflows within a step.
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::ode("x", 1e200, &["x"], |args| {
                let x = args.get("x");
                x * x
            }))
            .unwrap();
        registry.seal().unwrap();
        let order = resolve(&registry).unwrap();
        let evaluator = Evaluator::new(&registry, &order).unwrap();
        let mut snapshot = initial_snapshot(&registry, 1);
        let mut result = RunResult::new(&registry, 10, 1);

        let err = integrate(
            &evaluator,
            &mut snapshot,
            Scheme::Rk4,
            1.0,
            10,
            Verbosity::Silent,
            &mut result,
        )
        .unwrap_err();
        assert!(matches!(err, MacrodynError::NonFiniteState { field, .. } if field == "x"));

        // the initial state was recorded and remains valid
        assert_eq!(result.len(), 1);
        assert_eq!(result.field("x").unwrap().at(0), array![1e200]);
    }

    #[test]
    fn broadcasting_reproduces_single_instance_runs() {
        let registry = decay_registry();
        let order = resolve(&registry).unwrap();
        let evaluator = Evaluator::new(&registry, &order).unwrap();

        let single = run_decay(Scheme::Rk4, 0.02, 25);

        let mut snapshot = initial_snapshot(&registry, 4);
        let mut result = RunResult::new(&registry, 25, 4);
        integrate(
            &evaluator,
            &mut snapshot,
            Scheme::Rk4,
            0.02,
            25,
            Verbosity::Silent,
            &mut result,
        )
        .unwrap();

        let reference = single.field("x").unwrap();
        let wide = result.field("x").unwrap();
        for instance in 0..4 {
            assert_eq!(wide.instance(instance), reference.instance(0));
        }
    }

    #[test]
    fn scheme_names_round_trip() {
        for scheme in Scheme::all() {
            assert_eq!(scheme.to_string().parse::<Scheme>().unwrap(), scheme);
        }
        let err = "rk7".parse::<Scheme>().unwrap_err();
        assert!(matches!(err, MacrodynError::UnknownScheme(name) if name == "rk7"));
    }
}
