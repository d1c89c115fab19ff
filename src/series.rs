//! Simulation output container
//!
//! A [`ResultSeries`] is a set of metric sequences index-aligned with one
//! independent variable (years, swept condition values or seconds). It is
//! built once through [`SeriesBuilder`], which enforces the alignment and
//! finiteness invariants, and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::NumericDomainError;

/// One named output sequence
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub values: Vec<f64>,
}

/// Immutable, index-aligned simulation output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "UncheckedSeries")]
pub struct ResultSeries {
    label_name: String,
    labels: Vec<f64>,
    metrics: Vec<Metric>,
    metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct UncheckedSeries {
    label_name: String,
    labels: Vec<f64>,
    metrics: Vec<Metric>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl TryFrom<UncheckedSeries> for ResultSeries {
    type Error = NumericDomainError;

    fn try_from(unchecked: UncheckedSeries) -> Result<Self, Self::Error> {
        let mut builder = SeriesBuilder::new(unchecked.label_name, unchecked.labels);
        for metric in unchecked.metrics {
            builder = builder.metric(metric.name, metric.values);
        }
        for (key, value) in unchecked.metadata {
            builder = builder.meta(key, value);
        }
        builder.build()
    }
}

impl ResultSeries {
    pub fn builder(label_name: impl Into<String>, labels: Vec<f64>) -> SeriesBuilder {
        SeriesBuilder::new(label_name, labels)
    }

    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|metric| metric.name.as_str())
    }

    pub fn metric(&self, name: &str) -> Option<&[f64]> {
        self.metrics
            .iter()
            .find(|metric| metric.name == name)
            .map(|metric| metric.values.as_slice())
    }

    /// Last value of a metric (the end state of a projection)
    pub fn last(&self, name: &str) -> Option<f64> {
        self.metric(name).and_then(|values| values.last().copied())
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Copy with every label and value rounded to `decimals` places.
    ///
    /// Presentation only: simulators never round their own output.
    pub fn rounded(&self, decimals: u32) -> ResultSeries {
        let round = |value: f64| round_to(value, decimals);
        ResultSeries {
            label_name: self.label_name.clone(),
            labels: self.labels.iter().copied().map(round).collect(),
            metrics: self
                .metrics
                .iter()
                .map(|metric| Metric {
                    name: metric.name.clone(),
                    values: metric.values.iter().copied().map(round).collect(),
                })
                .collect(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Round `value` to `decimals` places (at most 15); values that would
/// overflow are returned unchanged
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(15) as i32);
    let rounded = (value * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Accumulates labels and metrics and validates them in one step
#[derive(Debug, Clone)]
pub struct SeriesBuilder {
    label_name: String,
    labels: Vec<f64>,
    metrics: Vec<Metric>,
    metadata: BTreeMap<String, String>,
}

impl SeriesBuilder {
    pub fn new(label_name: impl Into<String>, labels: Vec<f64>) -> Self {
        Self {
            label_name: label_name.into(),
            labels,
            metrics: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn metric(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.metrics.push(Metric {
            name: name.into(),
            values,
        });
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check alignment, uniqueness and finiteness, then freeze
    pub fn build(self) -> Result<ResultSeries, NumericDomainError> {
        if let Some(index) = self.labels.iter().position(|label| !label.is_finite()) {
            return Err(NumericDomainError::new(
                self.label_name,
                format!("label {index} is not finite"),
            ));
        }

        for (i, metric) in self.metrics.iter().enumerate() {
            if metric.values.len() != self.labels.len() {
                return Err(NumericDomainError::new(
                    metric.name.clone(),
                    format!(
                        "{} values for {} labels",
                        metric.values.len(),
                        self.labels.len()
                    ),
                ));
            }
            if let Some(index) = metric.values.iter().position(|value| !value.is_finite()) {
                return Err(NumericDomainError::new(
                    metric.name.clone(),
                    format!("value at index {index} is not finite"),
                ));
            }
            if self.metrics[..i].iter().any(|other| other.name == metric.name) {
                return Err(NumericDomainError::new(
                    metric.name.clone(),
                    "metric name appears twice",
                ));
            }
        }

        Ok(ResultSeries {
            label_name: self.label_name,
            labels: self.labels,
            metrics: self.metrics,
            metadata: self.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSeries {
        ResultSeries::builder("year", vec![0.0, 1.0, 2.0])
            .metric("co2_saved_Mt", vec![0.0, 1.234567, 2.5])
            .meta("model", "policy")
            .build()
            .unwrap()
    }

    #[test]
    fn test_metric_lookup() {
        let series = sample();
        assert_eq!(series.len(), 3);
        assert_eq!(series.metric("co2_saved_Mt"), Some(&[0.0, 1.234567, 2.5][..]));
        assert_eq!(series.last("co2_saved_Mt"), Some(2.5));
        assert_eq!(series.metric("missing"), None);
        assert_eq!(series.metadata().get("model").map(String::as_str), Some("policy"));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = ResultSeries::builder("year", vec![0.0, 1.0])
            .metric("co2_saved_Mt", vec![0.0])
            .build()
            .unwrap_err();
        assert_eq!(err.quantity, "co2_saved_Mt");
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = ResultSeries::builder("year", vec![0.0, 1.0])
            .metric("efficiency", vec![0.3, f64::NAN])
            .build()
            .unwrap_err();
        assert_eq!(err.quantity, "efficiency");

        assert!(ResultSeries::builder("year", vec![f64::INFINITY]).build().is_err());
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let result = ResultSeries::builder("year", vec![0.0])
            .metric("a", vec![1.0])
            .metric("a", vec![2.0])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rounded_is_a_copy() {
        let series = sample();
        let rounded = series.rounded(2);
        assert_eq!(rounded.metric("co2_saved_Mt"), Some(&[0.0, 1.23, 2.5][..]));
        assert_eq!(series.metric("co2_saved_Mt").unwrap()[1], 1.234567);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.5, 0), -1.0);
        assert_eq!(round_to(2.5, 40), 2.5);
        assert_eq!(round_to(f64::MAX, 3), f64::MAX);
    }

    #[test]
    fn test_json_export_and_reimport() {
        let series = sample();
        let json = serde_json::to_string(&series).unwrap();
        let back: ResultSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);

        let broken = r#"{"label_name":"year","labels":[0,1],"metrics":[{"name":"x","values":[1]}]}"#;
        assert!(serde_json::from_str::<ResultSeries>(broken).is_err());
    }
}
