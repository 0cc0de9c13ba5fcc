//! Run results: the recorded time series of every field.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::errors::{MacrodynError, MacrodynResult};
use crate::field::{FieldKind, FloatValue, Time};
use crate::registry::FieldRegistry;
use crate::state::Snapshot;

/// The recorded series of one field across a run.
///
/// Values are shaped `[time, instance]`. Parameters are recorded like any
/// other field (constant rows) so every series shares one uniform shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSeries {
    pub name: String,
    pub kind: FieldKind,
    pub unit: String,
    pub description: String,
    pub group: String,
    values: Array2<FloatValue>,
}

impl FieldSeries {
    /// The recorded values, shaped `[time, instance]`.
    pub fn values(&self) -> ArrayView2<'_, FloatValue> {
        self.values.view()
    }

    /// The values recorded at one time step, one per instance.
    pub fn at(&self, step: usize) -> ArrayView1<'_, FloatValue> {
        self.values.row(step)
    }

    /// The series of a single instance across time.
    pub fn instance(&self, index: usize) -> ArrayView1<'_, FloatValue> {
        self.values.column(index)
    }
}

/// How to restrict a result extraction to a subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldFilter {
    All,
    Kind(FieldKind),
    Group(String),
    Names(Vec<String>),
}

/// An ordered sequence of recorded snapshots plus their time stamps.
///
/// Owned exclusively by the run that produced it and read-only once the
/// integration loop terminates. A run aborted by a numerical error leaves a
/// truncated result covering every accepted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    time: Vec<Time>,
    series: Vec<FieldSeries>,
    instances: usize,
}

impl RunResult {
    /// Allocate storage for a run of `steps` accepted steps (plus the
    /// initial state) over every field in the registry.
    pub(crate) fn new(registry: &FieldRegistry, steps: usize, instances: usize) -> Self {
        let capacity = steps + 1;
        let mut series = Vec::with_capacity(registry.len());
        for field in registry.iter() {
            series.push(FieldSeries {
                name: field.name.clone(),
                kind: field.kind,
                unit: field.unit.clone(),
                description: field.description.clone(),
                group: field.group.clone(),
                values: Array2::from_elem((capacity, instances), FloatValue::NAN),
            });
        }
        Self {
            time: Vec::with_capacity(capacity),
            series,
            instances,
        }
    }

    /// Append the snapshot as the next recorded step.
    pub(crate) fn record(&mut self, time: Time, snapshot: &Snapshot) {
        let row = self.time.len();
        for series in &mut self.series {
            let value = snapshot
                .get(&series.name)
                .expect("recorded snapshot holds every registered field");
            series.values.row_mut(row).assign(value);
        }
        self.time.push(time);
    }

    /// Drop the unrecorded tail, e.g. after an aborted run.
    pub(crate) fn finish(&mut self) {
        let recorded = self.time.len();
        for series in &mut self.series {
            if series.values.nrows() != recorded {
                series.values = series.values.slice(s![..recorded, ..]).to_owned();
            }
        }
    }

    /// The recorded time stamps.
    pub fn times(&self) -> &[Time] {
        &self.time
    }

    /// Number of recorded steps (including the initial state).
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of parallel instances.
    pub fn instances(&self) -> usize {
        self.instances
    }

    /// The recorded series for one field.
    pub fn field(&self, name: &str) -> Option<&FieldSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    /// The series of a single instance of one field, as an owned array.
    pub fn instance_series(&self, name: &str, instance: usize) -> Option<Array1<FloatValue>> {
        self.field(name)
            .map(|series| series.instance(instance).to_owned())
    }

    /// Iterate over all recorded series.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSeries> {
        self.series.iter()
    }

    /// A deep copy restricted to the fields matching `filter`.
    ///
    /// The time axis is always retained. An unknown name in an explicit
    /// name list fails with [`MacrodynError::UnknownField`].
    pub fn filtered(&self, filter: &FieldFilter) -> MacrodynResult<RunResult> {
        let selected: Vec<&FieldSeries> = match filter {
            FieldFilter::All => self.series.iter().collect(),
            FieldFilter::Kind(kind) => self.series.iter().filter(|s| s.kind == *kind).collect(),
            FieldFilter::Group(group) => {
                self.series.iter().filter(|s| &s.group == group).collect()
            }
            FieldFilter::Names(names) => {
                let mut selected = Vec::with_capacity(names.len());
                for name in names {
                    match self.field(name) {
                        Some(series) => selected.push(series),
                        None => return Err(MacrodynError::UnknownField(name.clone())),
                    }
                }
                selected
            }
        };

        Ok(RunResult {
            time: self.time.clone(),
            series: selected.into_iter().cloned().collect(),
            instances: self.instances,
        })
    }
}
