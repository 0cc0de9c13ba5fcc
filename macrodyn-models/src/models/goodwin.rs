//! The reduced Goodwin employment/wage-share oscillator.
//!
//! A two-variable predator-prey style model of the labour market:
//!
//! $$ \dot\lambda = \lambda (g - \alpha - \beta) $$
//! $$ \dot\omega = \omega (\Phi(\lambda) - \alpha) $$
//!
//! with growth driven by the profit share, $g = (1 - \omega)/\nu - \delta$,
//! and a divergent Phillips curve
//! $\Phi(\lambda) = -\phi_0 + \phi_1 / (1 - \lambda)^2$ whose coefficients
//! derive from the single parameter `phinull` (the employment rate at which
//! wage bargaining is neutral).
//!
//! Typical behaviour: closed orbits around the equilibrium where
//! $g = \alpha + \beta$ and $\Phi(\lambda) = \alpha$.

use macrodyn_core::catalog::{ModelDefinition, Preset};
use macrodyn_core::field::FieldDefinition;

pub const NAME: &str = "goodwin";

pub fn definition() -> ModelDefinition {
    ModelDefinition::new(NAME, "reduced Goodwin employment/wage-share cycle")
        .with_field(
            FieldDefinition::parameter("alpha", 0.02)
                .with_unit("1 / yr")
                .with_description("labour productivity growth rate")
                .with_group("labour"),
        )
        .with_field(
            FieldDefinition::parameter("beta", 0.025)
                .with_unit("1 / yr")
                .with_description("population growth rate")
                .with_group("labour"),
        )
        .with_field(
            FieldDefinition::parameter("nu", 3.0)
                .with_unit("yr")
                .with_description("capital-to-output ratio")
                .with_group("production"),
        )
        .with_field(
            FieldDefinition::parameter("delta", 0.005)
                .with_unit("1 / yr")
                .with_description("capital depreciation rate")
                .with_group("production"),
        )
        .with_field(
            FieldDefinition::parameter("phinull", 0.04)
                .with_description("employment rate of neutral wage bargaining")
                .with_group("labour"),
        )
        .with_field(
            FieldDefinition::state_var("phi0", &["phinull"], |args| {
                let phinull = args.get("phinull");
                phinull / &(1.0 - &(phinull * phinull))
            })
            .with_description("Phillips curve offset")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::state_var("phi1", &["phinull"], |args| {
                let phinull = args.get("phinull");
                (phinull * phinull) * phinull / &(1.0 - &(phinull * phinull))
            })
            .with_description("Phillips curve curvature")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::state_var("phillips", &["phi0", "phi1", "lambda"], |args| {
                let squeeze = (1.0 - args.get("lambda")).mapv(|v| v * v);
                args.get("phi1") / &squeeze - args.get("phi0")
            })
            .with_unit("1 / yr")
            .with_description("wage growth from employment bargaining")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::state_var("g", &["omega", "nu", "delta"], |args| {
                (1.0 - args.get("omega")) / args.get("nu") - args.get("delta")
            })
            .with_unit("1 / yr")
            .with_description("output growth rate")
            .with_group("production"),
        )
        .with_field(
            FieldDefinition::ode("lambda", 0.95, &["lambda", "g", "alpha", "beta"], |args| {
                args.get("lambda") * &(args.get("g") - args.get("alpha") - args.get("beta"))
            })
            .with_description("employment rate")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::ode("omega", 0.85, &["omega", "phillips", "alpha"], |args| {
                args.get("omega") * &(args.get("phillips") - args.get("alpha"))
            })
            .with_description("wage share of output")
            .with_group("labour"),
        )
        .with_preset(
            "default",
            Preset::new("moderate oscillation around the equilibrium")
                .with_field("lambda", 0.95)
                .with_field("omega", 0.85),
        )
        .with_preset(
            "equilibrium",
            Preset::new("started near the stationary point")
                .with_field("lambda", 0.96733)
                .with_field("omega", 0.85),
        )
}
