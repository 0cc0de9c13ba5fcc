//! Dependency resolution: a canonical evaluation order for state variables.
//!
//! Parameter and ODE fields are always available at the current step, so
//! only state variables need ordering. The resolver builds a directed graph
//! with an edge from each state-variable dependency to its dependent and
//! topologically sorts it. Nodes are inserted in sorted-name order, so the
//! produced order is canonical for a given model regardless of the order in
//! which fields were registered.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::field::FieldKind;
use crate::registry::FieldRegistry;

/// The resolved evaluation order of a model.
///
/// Computed once at model-build time and immutable thereafter; the same
/// order is reused for every run and every parallel instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOrder {
    /// State variables in dependency order: each entry only reads fields
    /// that are parameters, ODE states, or state variables earlier in this
    /// list.
    pub state_vars: Vec<String>,
    /// ODE fields, sorted by name. The integrator state vector follows this
    /// order.
    pub ode: Vec<String>,
    /// Parameter fields, sorted by name.
    pub parameters: Vec<String>,
}

/// Compute the evaluation order for a sealed registry.
///
/// Fails with [`MacrodynError::NotSealed`] on an unsealed registry and with
/// [`MacrodynError::CyclicDependency`] when the state-variable graph cannot
/// be ordered. The reported cycle set is deterministic: it is the sorted
/// union of all strongly connected components of size greater than one,
/// plus any self-dependent state variable.
pub fn resolve(registry: &FieldRegistry) -> MacrodynResult<EvaluationOrder> {
    if !registry.is_sealed() {
        return Err(MacrodynError::NotSealed);
    }

    let names = registry.names_of_kind(FieldKind::StateVar);

    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for name in &names {
        nodes.insert(name, graph.add_node(name.clone()));
    }

    // dependency -> dependent, restricted to state variables; parameters and
    // ODE fields are sources and impose no ordering.
    for name in &names {
        let field = registry
            .get(name)
            .expect("state variable listed by the registry");
        for dependency in &field.dependencies {
            if let Some(&source) = nodes.get(dependency.as_str()) {
                graph.add_edge(source, nodes[name.as_str()], ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(EvaluationOrder {
            state_vars: order.into_iter().map(|n| graph[n].clone()).collect(),
            ode: registry.names_of_kind(FieldKind::Ode),
            parameters: registry.names_of_kind(FieldKind::Parameter),
        }),
        Err(_) => {
            let mut involved: Vec<String> = tarjan_scc(&graph)
                .into_iter()
                .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
                .flatten()
                .map(|n| graph[n].clone())
                .collect();
            involved.sort();
            Err(MacrodynError::CyclicDependency { involved })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDefinition;
    use ndarray::Array1;

    fn constant(args: &crate::field::Args) -> Array1<f64> {
        Array1::from_elem(args.instances(), 1.0)
    }

    fn chain_registry() -> FieldRegistry {
        // c -> b -> a -> (parameter p); registered in scrambled order
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("b", &["a"], |args| {
                args.get("a") * 2.0
            }))
            .unwrap();
        registry
            .register(FieldDefinition::parameter("p", 1.5))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("c", &["b", "p"], |args| {
                args.get("b") + args.get("p")
            }))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("a", &["p"], |args| {
                args.get("p").clone()
            }))
            .unwrap();
        registry.seal().unwrap();
        registry
    }

    fn position(order: &EvaluationOrder, name: &str) -> usize {
        order
            .state_vars
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("'{}' missing from order", name))
    }

    #[test]
    fn unsealed_registry_is_rejected() {
        let registry = FieldRegistry::new();
        assert!(matches!(
            resolve(&registry).unwrap_err(),
            MacrodynError::NotSealed
        ));
    }

    #[test]
    fn every_state_var_follows_its_dependencies() {
        let registry = chain_registry();
        let order = resolve(&registry).unwrap();

        assert_eq!(order.state_vars.len(), 3);
        assert!(position(&order, "a") < position(&order, "b"));
        assert!(position(&order, "b") < position(&order, "c"));
        assert_eq!(order.parameters, vec!["p".to_string()]);
        assert_eq!(order.ode, vec!["time".to_string()]);
    }

    #[test]
    fn order_is_canonical_across_registration_orders() {
        let first = resolve(&chain_registry()).unwrap();

        // Same model, different registration order
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("a", &["p"], |args| {
                args.get("p").clone()
            }))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("c", &["b", "p"], |args| {
                args.get("b") + args.get("p")
            }))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("b", &["a"], |args| {
                args.get("a") * 2.0
            }))
            .unwrap();
        registry
            .register(FieldDefinition::parameter("p", 1.5))
            .unwrap();
        registry.seal().unwrap();

        assert_eq!(first, resolve(&registry).unwrap());
    }

    #[test]
    fn two_cycle_is_reported_with_both_names() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("a", &["b"], |args| {
                args.get("b").clone()
            }))
            .unwrap();
        registry
            .register(FieldDefinition::state_var("b", &["a"], |args| {
                args.get("a").clone()
            }))
            .unwrap();
        registry.seal().unwrap();

        let err = resolve(&registry).unwrap_err();
        match err {
            MacrodynError::CyclicDependency { involved } => {
                assert_eq!(involved, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected CyclicDependency, got {:?}", other),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("a", &["a"], |args| {
                args.get("a").clone()
            }))
            .unwrap();
        registry.seal().unwrap();

        let err = resolve(&registry).unwrap_err();
        assert!(matches!(
            err,
            MacrodynError::CyclicDependency { involved } if involved == vec!["a".to_string()]
        ));
    }

    #[test]
    fn ode_self_reference_is_not_a_cycle() {
        // An ODE reading its own value is the normal case, not a cycle.
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::ode("x", 1.0, &["x"], |args| {
                args.get("x") * -1.0
            }))
            .unwrap();
        registry.seal().unwrap();

        let order = resolve(&registry).unwrap();
        assert!(order.state_vars.is_empty());
        assert_eq!(order.ode, vec!["time".to_string(), "x".to_string()]);
    }

    #[test]
    fn dependency_free_state_var_resolves() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("one", &[], constant))
            .unwrap();
        registry.seal().unwrap();
        let order = resolve(&registry).unwrap();
        assert_eq!(order.state_vars, vec!["one".to_string()]);
    }
}
