//! The run-state snapshot: every field's current value at one instant.

use ndarray::Array1;
use std::collections::HashMap;

use crate::field::{FloatValue, Time, TIME_FIELD};

/// The full mapping from field name to current value at one instant.
///
/// A snapshot is created at simulation start from defaults plus preset and
/// override values, mutated field-by-field by the evaluator in dependency
/// order, and recorded into the run result after each accepted step.
///
/// Every value carries the same leading parallel-instance length. Cloning a
/// snapshot deep-copies the underlying arrays, so trial states built by the
/// stepping schemes can never alias the accepted state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    values: HashMap<String, Array1<FloatValue>>,
    instances: usize,
}

impl Snapshot {
    /// Create an empty snapshot for `instances` parallel instances.
    pub fn new(instances: usize) -> Self {
        Self {
            values: HashMap::new(),
            instances,
        }
    }

    /// Number of parallel instances.
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// Current value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&Array1<FloatValue>> {
        self.values.get(name)
    }

    /// Insert or replace a field's value.
    ///
    /// The value's length must match the snapshot's instance count; this is
    /// established by the callers (hub and evaluator) and asserted here.
    pub fn set(&mut self, name: &str, value: Array1<FloatValue>) {
        debug_assert_eq!(
            value.len(),
            self.instances,
            "value for '{}' does not match the instance count",
            name
        );
        self.values.insert(name.to_string(), value);
    }

    /// The current simulation time.
    ///
    /// Time is stored as an ordinary field ([`TIME_FIELD`]) with one copy
    /// per instance; all instances share the same clock.
    pub fn time(&self) -> Time {
        self.values
            .get(TIME_FIELD)
            .map(|t| t[0])
            .unwrap_or(Time::NAN)
    }

    /// Overwrite the time field for every instance.
    pub fn set_time(&mut self, time: Time) {
        let instances = self.instances;
        self.values
            .insert(TIME_FIELD.to_string(), Array1::from_elem(instances, time));
    }

    /// True if the named field holds only finite values.
    pub fn is_finite(&self, name: &str) -> bool {
        self.values
            .get(name)
            .map(|value| value.iter().all(|v| v.is_finite()))
            .unwrap_or(false)
    }
}
