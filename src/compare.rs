//! Scenario comparison utilities

use ndarray::ArrayView1;

use crate::error::{report_defect, AlignmentError, Result};
use crate::series::ResultSeries;

/// Check that two series share their label axis and metric names
pub fn check_alignment(a: &ResultSeries, b: &ResultSeries) -> std::result::Result<(), AlignmentError> {
    if a.label_name() != b.label_name() {
        return Err(AlignmentError::LabelName {
            left: a.label_name().to_string(),
            right: b.label_name().to_string(),
        });
    }
    if a.len() != b.len() {
        return Err(AlignmentError::LabelCount {
            left: a.len(),
            right: b.len(),
        });
    }
    if let Some((index, (left, right))) = a
        .labels()
        .iter()
        .zip(b.labels())
        .enumerate()
        .find(|(_, (left, right))| left != right)
    {
        return Err(AlignmentError::LabelMismatch {
            index,
            left: *left,
            right: *right,
        });
    }
    for name in a.metric_names() {
        if b.metric(name).is_none() {
            return Err(AlignmentError::MetricMismatch { metric: name.to_string() });
        }
    }
    for name in b.metric_names() {
        if a.metric(name).is_none() {
            return Err(AlignmentError::MetricMismatch { metric: name.to_string() });
        }
    }
    Ok(())
}

/// Pointwise `a - b` of every metric
pub fn diff(a: &ResultSeries, b: &ResultSeries) -> Result<ResultSeries> {
    check_alignment(a, b)?;

    let mut builder = ResultSeries::builder(a.label_name(), a.labels().to_vec())
        .meta("comparison", "difference");
    if let Some(model) = a.metadata().get("model") {
        builder = builder.meta("model", model.clone());
    }
    for metric in a.metrics() {
        let left = ArrayView1::from(metric.values.as_slice());
        // presence checked by check_alignment
        let right = ArrayView1::from(b.metric(&metric.name).unwrap_or_default());
        builder = builder.metric(metric.name.clone(), (&left - &right).to_vec());
    }
    builder.build().map_err(|err| report_defect("comparison", err))
}

/// Baseline and alternative scenario over the same label axis
#[derive(Debug, Clone)]
pub struct ScenarioComparison {
    baseline: ResultSeries,
    scenario: ResultSeries,
}

impl ScenarioComparison {
    pub fn new(baseline: ResultSeries, scenario: ResultSeries) -> std::result::Result<Self, AlignmentError> {
        check_alignment(&baseline, &scenario)?;
        Ok(Self { baseline, scenario })
    }

    pub fn baseline(&self) -> &ResultSeries {
        &self.baseline
    }

    pub fn scenario(&self) -> &ResultSeries {
        &self.scenario
    }

    /// Scenario minus baseline at every label
    pub fn delta(&self) -> Result<ResultSeries> {
        diff(&self.scenario, &self.baseline)
    }

    /// Scenario minus baseline at the last label, per metric
    pub fn final_deltas(&self) -> Vec<(String, f64)> {
        self.scenario
            .metric_names()
            .filter_map(|name| {
                let delta = self.scenario.last(name)? - self.baseline.last(name)?;
                Some((name.to_string(), delta))
            })
            .collect()
    }
}
