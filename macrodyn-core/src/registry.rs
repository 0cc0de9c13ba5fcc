//! The field registry: the closed set of fields making up one model.

use ndarray::Array1;
use std::collections::HashMap;

use crate::errors::{MacrodynError, MacrodynResult};
use crate::field::{FieldDefinition, FieldKind, TIME_FIELD};

/// Holds every declared field of a model.
///
/// Fields are registered one by one and the set is then frozen with
/// [`FieldRegistry::seal`], which validates that every declared dependency
/// resolves to a registered field. Resolution and evaluation both require a
/// sealed registry.
///
/// Every registry starts out containing the implicit [`TIME_FIELD`]: an ODE
/// field with unit derivative, so the current time is available to equations
/// and advances exactly under any stepping scheme.
#[derive(Debug)]
pub struct FieldRegistry {
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
    sealed: bool,
}

impl FieldRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            fields: Vec::new(),
            index: HashMap::new(),
            sealed: false,
        };

        // dt/dt = 1, one copy per instance
        let time = FieldDefinition::ode(TIME_FIELD, 0.0, &[], |args| {
            Array1::from_elem(args.instances(), 1.0)
        })
        .with_unit("yr")
        .with_description("simulation time");
        registry
            .register(time)
            .expect("registering the time field cannot fail on an empty registry");

        registry
    }

    /// Register a field.
    ///
    /// Fails with [`MacrodynError::DuplicateField`] if the name is already
    /// taken (including the reserved [`TIME_FIELD`]) and with
    /// [`MacrodynError::Sealed`] once the registry has been sealed.
    pub fn register(&mut self, field: FieldDefinition) -> MacrodynResult<()> {
        if self.sealed {
            return Err(MacrodynError::Sealed);
        }
        if self.index.contains_key(&field.name) {
            return Err(MacrodynError::DuplicateField(field.name.clone()));
        }

        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Freeze the field set and validate it as a whole.
    ///
    /// Every dependency declared by any field must name a registered field
    /// of any kind; the first violation (in registration order) is reported
    /// as [`MacrodynError::UnknownDependency`]. Sealing an already-sealed
    /// registry is a no-op.
    pub fn seal(&mut self) -> MacrodynResult<()> {
        if self.sealed {
            return Ok(());
        }

        for field in &self.fields {
            for dependency in &field.dependencies {
                if !self.index.contains_key(dependency) {
                    return Err(MacrodynError::UnknownDependency {
                        field: field.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            if field.kind == FieldKind::Parameter && !field.dependencies.is_empty() {
                log::warn!(
                    "parameter '{}' declares dependencies; they are ignored",
                    field.name
                );
            }
        }

        self.sealed = true;
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate over all fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter()
    }

    /// Names of all fields of the given kind, sorted.
    pub fn names_of_kind(&self, kind: FieldKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDefinition;

    #[test]
    fn time_field_is_implicit() {
        let registry = FieldRegistry::new();
        let time = registry.get(TIME_FIELD).unwrap();
        assert_eq!(time.kind, FieldKind::Ode);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::parameter("alpha", 0.02))
            .unwrap();

        let err = registry
            .register(FieldDefinition::parameter("alpha", 0.03))
            .unwrap_err();
        assert!(matches!(err, MacrodynError::DuplicateField(name) if name == "alpha"));
    }

    #[test]
    fn time_name_is_reserved() {
        let mut registry = FieldRegistry::new();
        let err = registry
            .register(FieldDefinition::parameter(TIME_FIELD, 0.0))
            .unwrap_err();
        assert!(matches!(err, MacrodynError::DuplicateField(_)));
    }

    #[test]
    fn seal_validates_dependencies() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::state_var("y", &["missing"], |args| {
                args.get("missing").clone()
            }))
            .unwrap();

        let err = registry.seal().unwrap_err();
        assert!(matches!(
            err,
            MacrodynError::UnknownDependency { field, dependency }
                if field == "y" && dependency == "missing"
        ));
        assert!(!registry.is_sealed());
    }

    #[test]
    fn register_after_seal_fails() {
        let mut registry = FieldRegistry::new();
        registry.seal().unwrap();

        let err = registry
            .register(FieldDefinition::parameter("late", 1.0))
            .unwrap_err();
        assert!(matches!(err, MacrodynError::Sealed));
    }

    #[test]
    fn seal_is_idempotent() {
        let mut registry = FieldRegistry::new();
        registry.seal().unwrap();
        registry.seal().unwrap();
        assert!(registry.is_sealed());
    }

    #[test]
    fn names_of_kind_are_sorted() {
        let mut registry = FieldRegistry::new();
        registry
            .register(FieldDefinition::parameter("nu", 3.0))
            .unwrap();
        registry
            .register(FieldDefinition::parameter("alpha", 0.02))
            .unwrap();

        assert_eq!(
            registry.names_of_kind(FieldKind::Parameter),
            vec!["alpha".to_string(), "nu".to_string()]
        );
    }
}
