#![allow(dead_code)]

//! Small model definitions shared by the unit tests.

use crate::catalog::{ModelDefinition, Preset};
use crate::field::FieldDefinition;

/// `dx/dt = -rate * x` with a derived `doubled = 2x`, plus a `slow` preset.
pub(crate) fn exponential_decay() -> ModelDefinition {
    ModelDefinition::new("decay", "a single exponentially decaying state")
        .with_field(FieldDefinition::parameter("rate", 1.0).with_unit("1 / yr"))
        .with_field(FieldDefinition::ode("x", 1.0, &["x", "rate"], |args| {
            args.get("rate") * -1.0 * args.get("x")
        }))
        .with_field(FieldDefinition::state_var("doubled", &["x"], |args| {
            args.get("x") * 2.0
        }))
        .with_preset(
            "slow",
            Preset::new("half the decay rate")
                .with_field("rate", 0.5)
                .with_field("x", 2.0),
        )
}

/// Two state variables depending on each other; construction must fail.
pub(crate) fn cyclic() -> ModelDefinition {
    ModelDefinition::new("cyclic", "mutually dependent state variables")
        .with_field(FieldDefinition::state_var("a", &["b"], |args| {
            args.get("b").clone()
        }))
        .with_field(FieldDefinition::state_var("b", &["a"], |args| {
            args.get("a").clone()
        }))
}

/// `dx/dt = x^2` from a huge initial value; overflows within one step.
pub(crate) fn unstable() -> ModelDefinition {
    ModelDefinition::new("unstable", "quadratic blow-up")
        .with_field(FieldDefinition::ode("x", 1e200, &["x"], |args| {
            let x = args.get("x");
            x * x
        }))
}
