use thiserror::Error;

use crate::field::{FieldKind, Time};

/// Error type for invalid operations.
///
/// Errors fall into three classes, exposed via [`MacrodynError::kind`]:
///
/// * [`ErrorKind::Structural`]: raised while building a model (registering
///   fields, sealing, resolving the dependency order). Always fatal to model
///   construction.
/// * [`ErrorKind::Configuration`]: raised from user-facing hub operations
///   with bad arguments. Fatal to that call only; the caller can retry with
///   corrected arguments.
/// * [`ErrorKind::Numerical`]: raised mid-integration. The run is aborted
///   but the partial results recorded up to the last good step remain valid.
#[derive(Error, Debug)]
pub enum MacrodynError {
    #[error("field '{0}' is already registered")]
    DuplicateField(String),
    #[error("field '{field}' depends on '{dependency}', which is not a registered field")]
    UnknownDependency { field: String, dependency: String },
    #[error("cyclic dependency between state variables: {}", involved.join(", "))]
    CyclicDependency { involved: Vec<String> },
    #[error("the field registry must be sealed before it can be resolved or evaluated")]
    NotSealed,
    #[error("the field registry is sealed; no further fields can be registered")]
    Sealed,

    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{name}' is a {kind} and cannot be set directly")]
    FieldNotSettable { name: String, kind: FieldKind },
    #[error("unknown integration scheme '{0}'")]
    UnknownScheme(String),
    #[error("invalid step configuration: {0}")]
    InvalidStep(String),
    #[error("value for field '{field}' has {got} instances, expected {expected}")]
    ShapeMismatch {
        field: String,
        expected: usize,
        got: usize,
    },
    #[error("instance count must be at least 1")]
    InstanceCount,
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("failed to parse preset: {0}")]
    PresetParse(String),
    #[error("no results available; run the model first")]
    ResultsNotAvailable,

    #[error("field '{field}' became non-finite at t = {time}")]
    NonFiniteState { field: String, time: Time },
    #[error("adaptive solver failed: {0}")]
    SolverFailure(String),
}

/// Broad recoverability class of a [`MacrodynError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    Configuration,
    Numerical,
}

impl MacrodynError {
    /// The recoverability class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        use MacrodynError::*;
        match self {
            DuplicateField(_) | UnknownDependency { .. } | CyclicDependency { .. } | NotSealed
            | Sealed => ErrorKind::Structural,
            UnknownField(_)
            | FieldNotSettable { .. }
            | UnknownScheme(_)
            | InvalidStep(_)
            | ShapeMismatch { .. }
            | InstanceCount
            | UnknownPreset(_)
            | UnknownModel(_)
            | PresetParse(_)
            | ResultsNotAvailable => ErrorKind::Configuration,
            NonFiniteState { .. } | SolverFailure(_) => ErrorKind::Numerical,
        }
    }
}

/// Convenience type for `Result<T, MacrodynError>`.
pub type MacrodynResult<T> = Result<T, MacrodynError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert_eq!(
            MacrodynError::DuplicateField("x".to_string()).kind(),
            ErrorKind::Structural
        );
        assert_eq!(
            MacrodynError::UnknownScheme("rk7".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            MacrodynError::NonFiniteState {
                field: "x".to_string(),
                time: 1.0
            }
            .kind(),
            ErrorKind::Numerical
        );
    }

    #[test]
    fn cyclic_message_lists_fields() {
        let err = MacrodynError::CyclicDependency {
            involved: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic dependency between state variables: a, b"
        );
    }
}
