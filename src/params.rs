//! Scenario parameters
//!
//! Raw user input (JSON numbers or numeric strings keyed by name) is checked
//! against the schema of a scenario kind and turned into an immutable
//! [`ParameterSet`]. Construction is all-or-nothing: every declared value is
//! present (or defaulted), finite, integral where required, and inside its
//! range. Out-of-range values are rejected, never clamped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

/// Which simulator a parameter set is meant for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Reactor,
    Policy,
}

impl ParameterKind {
    /// Declared parameters for this kind, in display order
    pub fn schema(self) -> &'static [ParamSpec] {
        match self {
            ParameterKind::Reactor => crate::reactor::REACTOR_SCHEMA,
            ParameterKind::Policy => crate::policy::POLICY_SCHEMA,
        }
    }

    pub fn spec(self, name: &str) -> Option<&'static ParamSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Reactor => f.write_str("reactor"),
            ParameterKind::Policy => f.write_str("policy"),
        }
    }
}

/// Declaration of a single scenario parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    /// `None` marks the parameter as required
    pub default: Option<f64>,
    /// Value must be a whole number
    pub integer: bool,
}

impl ParamSpec {
    /// Check one already-numeric value against this declaration
    pub fn check(&self, value: f64) -> Result<f64, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                parameter: self.name.to_string(),
            });
        }
        if self.integer && value.fract() != 0.0 {
            return Err(ValidationError::NotInteger {
                parameter: self.name.to_string(),
                value,
            });
        }
        if value < self.min || value > self.max {
            return Err(ValidationError::OutOfRange {
                parameter: self.name.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        // -0.0 and 0.0 must produce the same canonical key
        Ok(if value == 0.0 { 0.0 } else { value })
    }
}

/// What to do with names the schema does not declare
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownParameters {
    /// Fail with [`ValidationError::Unknown`]
    #[default]
    Reject,
    /// Drop them silently (forward-compatible clients)
    Ignore,
}

/// A value as supplied by the UI layer, before conversion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    fn to_number(&self, parameter: &str) -> Result<f64, ValidationError> {
        match self {
            RawValue::Number(value) => Ok(*value),
            RawValue::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| ValidationError::NotNumeric {
                        parameter: parameter.to_string(),
                        raw: text.clone(),
                    })
            }
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// Raw name/value input for one scenario
pub type RawValues = BTreeMap<String, RawValue>;

/// Validated, immutable scenario input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "UncheckedParameterSet")]
pub struct ParameterSet {
    kind: ParameterKind,
    values: BTreeMap<String, f64>,
}

#[derive(Deserialize)]
struct UncheckedParameterSet {
    kind: ParameterKind,
    values: BTreeMap<String, f64>,
}

impl TryFrom<UncheckedParameterSet> for ParameterSet {
    type Error = ValidationError;

    fn try_from(unchecked: UncheckedParameterSet) -> Result<Self, Self::Error> {
        let raw: RawValues = unchecked
            .values
            .into_iter()
            .map(|(name, value)| (name, RawValue::Number(value)))
            .collect();
        ParameterSet::from_raw(unchecked.kind, &raw, UnknownParameters::Reject)
    }
}

impl ParameterSet {
    /// Validate raw input against the schema of `kind`
    pub fn from_raw(
        kind: ParameterKind,
        raw: &RawValues,
        unknown: UnknownParameters,
    ) -> Result<Self, ValidationError> {
        if unknown == UnknownParameters::Reject {
            if let Some(name) = raw.keys().find(|name| kind.spec(name).is_none()) {
                return Err(ValidationError::Unknown {
                    parameter: name.clone(),
                    kind,
                });
            }
        }

        let mut values = BTreeMap::new();
        for spec in kind.schema() {
            let value = match raw.get(spec.name) {
                Some(raw_value) => raw_value.to_number(spec.name)?,
                None => spec.default.ok_or_else(|| ValidationError::Missing {
                    parameter: spec.name.to_string(),
                })?,
            };
            values.insert(spec.name.to_string(), spec.check(value)?);
        }

        Ok(Self { kind, values })
    }

    /// Convenience constructor for numeric input, rejecting unknown names
    pub fn from_pairs(kind: ParameterKind, pairs: &[(&str, f64)]) -> Result<Self, ValidationError> {
        let raw: RawValues = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), RawValue::Number(*value)))
            .collect();
        Self::from_raw(kind, &raw, UnknownParameters::Reject)
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Fetch a declared value; fails only if `name` is not in the schema
    pub fn require(&self, name: &str) -> Result<f64, ValidationError> {
        self.get(name).ok_or_else(|| ValidationError::Missing {
            parameter: name.to_string(),
        })
    }

    /// Fail unless this set was built for `expected`
    pub fn expect_kind(&self, expected: ParameterKind) -> Result<(), ValidationError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(ValidationError::WrongKind {
                expected,
                found: self.kind,
            })
        }
    }

    /// Canonical encoding of the full value mapping, for memoization
    pub fn key(&self) -> ParameterKey {
        ParameterKey {
            kind: self.kind,
            values: self
                .values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_bits()))
                .collect(),
        }
    }

    /// Canonical encoding restricted to `names`, for operations that read a subset
    pub fn key_for(&self, names: &[&str]) -> ParameterKey {
        ParameterKey {
            kind: self.kind,
            values: self
                .values
                .iter()
                .filter(|(name, _)| names.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.to_bits()))
                .collect(),
        }
    }
}

/// Hashable identity of a [`ParameterSet`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterKey {
    kind: ParameterKind,
    values: Vec<(String, u64)>,
}
