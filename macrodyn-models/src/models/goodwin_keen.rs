//! The reduced Goodwin-Keen model: banks, households and production.
//!
//! Extends the Goodwin cycle with private debt. Investment is a convex
//! function of the profit share, loans finance the gap between investment
//! and profit, and prices carry a markup dynamic:
//!
//! $$ \dot\lambda = \lambda (g - \alpha - \beta) $$
//! $$ \dot\omega = \omega \, \Phi(\lambda) - \tfrac{1}{2} i $$
//! $$ \dot d = \kappa - \pi - d (g + i) $$
//!
//! with $\pi = 1 - \omega - r d$,
//! $\kappa = (k_0 + k_1 e^{k_2 \pi}) \cdot s$,
//! $g = \kappa / \nu - \delta$ and $i = \eta (\mu \omega - 1)$.
//!
//! The solvency dampening $s$ on lending is currently inactive (constant
//! one); the `zsolv` exponent is kept as a parameter so presets carrying it
//! remain loadable.
//!
//! Typical behaviour: convergent oscillation around a Solow-like point, or
//! a debt crisis when investment outruns profit for too long.

use macrodyn_core::catalog::{ModelDefinition, Preset};
use macrodyn_core::field::FieldDefinition;
use ndarray::Array1;

pub const NAME: &str = "goodwin-keen";

pub fn definition() -> ModelDefinition {
    ModelDefinition::new(NAME, "reduced Goodwin-Keen cycle with private debt")
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
            FieldDefinition::parameter("k0", -0.0065)
                .with_description("investment function offset")
                .with_group("finance"),
        )
        .with_field(
            FieldDefinition::parameter("k1", (-5.0f64).exp())
                .with_description("investment function scale")
                .with_group("finance"),
        )
        .with_field(
            FieldDefinition::parameter("k2", 20.0)
                .with_description("investment sensitivity to profit")
                .with_group("finance"),
        )
        .with_field(
            FieldDefinition::parameter("r", 0.03)
                .with_unit("1 / yr")
                .with_description("interest rate on private debt")
                .with_group("finance"),
        )
        .with_field(
            FieldDefinition::parameter("mu", 1.3)
                .with_description("price markup")
                .with_group("prices"),
        )
        .with_field(
            FieldDefinition::parameter("eta", 0.1)
                .with_unit("1 / yr")
                .with_description("price adjustment speed")
                .with_group("prices"),
        )
        .with_field(
            FieldDefinition::parameter("zsolv", 0.5)
                .with_description("solvency dampening exponent (inactive)")
                .with_group("finance"),
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
            FieldDefinition::state_var("pi", &["omega", "r", "d"], |args| {
                1.0 - args.get("omega") - &(args.get("r") * args.get("d"))
            })
            .with_description("profit share of output")
            .with_group("finance"),
        )
        .with_field(
            FieldDefinition::state_var("solvability", &[], |args| {
                // loan dampening disabled: lending is unconditional
                Array1::from_elem(args.instances(), 1.0)
            })
            .with_description("solvency dampening on lending (inactive)")
            .with_group("finance"),
        )
        .with_field(
            FieldDefinition::state_var(
                "kappa",
                &["k0", "k1", "k2", "pi", "solvability"],
                |args| {
                    let surge = (args.get("k2") * args.get("pi")).mapv(f64::exp);
                    (args.get("k0") + &(args.get("k1") * &surge)) * args.get("solvability")
                },
            )
            .with_description("investment share of output")
            .with_group("finance"),
        )
        .with_field(
            FieldDefinition::state_var("g", &["kappa", "nu", "delta"], |args| {
                args.get("kappa") / args.get("nu") - args.get("delta")
            })
            .with_unit("1 / yr")
            .with_description("output growth rate")
            .with_group("production"),
        )
        .with_field(
            FieldDefinition::state_var("inflation", &["eta", "mu", "omega"], |args| {
                args.get("eta") * &(args.get("mu") * args.get("omega") - 1.0)
            })
            .with_unit("1 / yr")
            .with_description("price inflation from markup dynamics")
            .with_group("prices"),
        )
        .with_field(
            FieldDefinition::ode("lambda", 0.95, &["lambda", "g", "alpha", "beta"], |args| {
                args.get("lambda") * &(args.get("g") - args.get("alpha") - args.get("beta"))
            })
            .with_description("employment rate")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::ode(
                "omega",
                0.85,
                &["omega", "phillips", "inflation"],
                |args| {
                    args.get("omega") * args.get("phillips")
                        - &(args.get("inflation") * 0.5)
                },
            )
            .with_description("wage share of output")
            .with_group("labour"),
        )
        .with_field(
            FieldDefinition::ode(
                "d",
                2.0,
                &["d", "kappa", "pi", "g", "inflation"],
                |args| {
                    args.get("kappa")
                        - args.get("pi")
                        - &(args.get("d") * &(args.get("g") + args.get("inflation")))
                },
            )
            .with_description("private debt relative to output")
            .with_group("finance"),
        )
        .with_preset(
            "default",
            Preset::new("convergent oscillation around the Solow point")
                .with_field("lambda", 0.95)
                .with_field("omega", 0.85)
                .with_field("d", 2.0)
                .with_field("alpha", 0.02)
                .with_field("beta", 0.025)
                .with_field("nu", 3.0)
                .with_field("delta", 0.005)
                .with_field("phinull", 0.04)
                .with_field("k0", -0.0065)
                .with_field("k1", (-5.0f64).exp())
                .with_field("k2", 20.0)
                .with_field("r", 0.03),
        )
}
