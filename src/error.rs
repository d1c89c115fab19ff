//! Error taxonomy for the simulation core

use thiserror::Error;

use crate::params::ParameterKind;

/// Bad, missing or out-of-range input. Always recoverable by re-prompting the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required parameter `{parameter}`")]
    Missing { parameter: String },

    #[error("parameter `{parameter}` is not numeric: {raw:?}")]
    NotNumeric { parameter: String, raw: String },

    #[error("parameter `{parameter}` is not a finite number")]
    NotFinite { parameter: String },

    #[error("parameter `{parameter}` must be a whole number, got {value}")]
    NotInteger { parameter: String, value: f64 },

    #[error("parameter `{parameter}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown parameter `{parameter}` for {kind:?} scenario")]
    Unknown {
        parameter: String,
        kind: ParameterKind,
    },

    #[error("expected a {expected:?} parameter set, got {found:?}")]
    WrongKind {
        expected: ParameterKind,
        found: ParameterKind,
    },

    #[error("{kind:?} scenarios do not support mode `{mode}`")]
    UnsupportedMode { kind: ParameterKind, mode: String },
}

impl ValidationError {
    /// Name of the offending parameter, when the error concerns a single one
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::Missing { parameter }
            | Self::NotNumeric { parameter, .. }
            | Self::NotFinite { parameter }
            | Self::NotInteger { parameter, .. }
            | Self::OutOfRange { parameter, .. }
            | Self::Unknown { parameter, .. } => Some(parameter),
            Self::WrongKind { .. } | Self::UnsupportedMode { .. } => None,
        }
    }
}

/// Two result series cannot be compared point by point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignmentError {
    #[error("label count differs: {left} vs {right}")]
    LabelCount { left: usize, right: usize },

    #[error("label {index} differs: {left} vs {right}")]
    LabelMismatch { index: usize, left: f64, right: f64 },

    #[error("label axis differs: `{left}` vs `{right}`")]
    LabelName { left: String, right: String },

    #[error("metric `{metric}` is missing from one of the series")]
    MetricMismatch { metric: String },
}

/// An intermediate quantity left its mathematical domain.
///
/// Unreachable for inputs inside the declared parameter ranges; seeing one
/// is a defect in the model, not a user error.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("numeric domain violation in `{quantity}`: {detail}")]
pub struct NumericDomainError {
    pub quantity: String,
    pub detail: String,
}

impl NumericDomainError {
    pub fn new(quantity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            quantity: quantity.into(),
            detail: detail.into(),
        }
    }
}

/// Any failure a simulation entry point can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    /// Details go to the log; callers only learn that the run failed.
    #[error("internal simulation failure")]
    NumericDomain(#[from] NumericDomainError),
}

impl SimError {
    /// True when the user can fix the failure by changing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Log a model defect with full detail before it is surfaced opaquely
pub(crate) fn report_defect(model: &str, err: NumericDomainError) -> SimError {
    log::error!("{model} model defect: {err}");
    SimError::NumericDomain(err)
}
