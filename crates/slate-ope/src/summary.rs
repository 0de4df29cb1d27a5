//! Result tables and accuracy metrics.
//!
//! Every table is keyed by estimator name and keeps the registry order, so
//! two runs over the same registry print rows in the same order. Tables
//! serialize as JSON objects.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize, ser::SerializeMap as _};
use slate_ope_estimator::ConfidenceInterval;

use crate::{error::InvalidArgumentError, warning::WarningSink};

/// Name-keyed rows in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorTable<T> {
    rows: Vec<(String, T)>,
}

impl<T> Default for EstimatorTable<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T> EstimatorTable<T> {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.rows.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> + '_ {
        self.rows.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds a new table with the same names and mapped values.
    pub fn map<U, F>(&self, mut f: F) -> EstimatorTable<U>
    where
        F: FnMut(&T) -> U,
    {
        self.rows
            .iter()
            .map(|(name, value)| (name.clone(), f(value)))
            .collect()
    }
}

impl<T> FromIterator<(String, T)> for EstimatorTable<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<T> Serialize for EstimatorTable<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (name, value) in &self.rows {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Point estimate per estimator.
pub type PolicyValues = EstimatorTable<f64>;

/// Bootstrap intervals per estimator, with the level they were computed at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyValueIntervals {
    pub alpha: f64,
    pub intervals: EstimatorTable<ConfidenceInterval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicyValueSummaryRow {
    pub estimated_policy_value: f64,
    /// `estimated_policy_value / behavior_policy_value`, or `NaN` when the
    /// behavior value is not positive.
    pub relative_estimated_policy_value: f64,
}

pub type PolicyValueSummary = EstimatorTable<PolicyValueSummaryRow>;

/// Divides each point estimate by the behavior policy value.
///
/// A behavior value that is not strictly positive (including `NaN`) yields a
/// `NaN` relative column and exactly one warning on `sink`.
pub fn relative_policy_values(
    values: &PolicyValues,
    behavior_policy_value: f64,
    sink: &dyn WarningSink,
) -> PolicyValueSummary {
    let denominator = if behavior_policy_value > 0.0 {
        behavior_policy_value
    } else {
        sink.warn(&format!(
            "behavior policy value is {behavior_policy_value} (<= 0), relative estimated policy values are set to NaN"
        ));
        f64::NAN
    };
    values.map(|&estimated| PolicyValueSummaryRow {
        estimated_policy_value: estimated,
        relative_estimated_policy_value: estimated / denominator,
    })
}

/// Accuracy metric against a ground-truth policy value.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// `|estimate - truth| / |truth|`.
    #[default]
    RelativeEe,
    /// `(estimate - truth)^2`.
    Se,
}

impl Metric {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RelativeEe => "relative-ee",
            Self::Se => "se",
        }
    }

    /// Rejects ground truths the metric cannot be computed against.
    pub fn validate_ground_truth(self, ground_truth: f64) -> Result<(), InvalidArgumentError> {
        if !ground_truth.is_finite() {
            return Err(InvalidArgumentError::NonFiniteGroundTruth {
                value: ground_truth,
            });
        }
        if self.is_relative_ee() && ground_truth == 0.0 {
            return Err(InvalidArgumentError::ZeroGroundTruth);
        }
        Ok(())
    }

    #[must_use]
    pub fn evaluate(self, estimated: f64, ground_truth: f64) -> f64 {
        match self {
            Self::RelativeEe => (estimated - ground_truth).abs() / ground_truth.abs(),
            Self::Se => (estimated - ground_truth).powi(2),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = InvalidArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relative-ee" => Ok(Self::RelativeEe),
            "se" => Ok(Self::Se),
            _ => Err(InvalidArgumentError::UnknownMetric {
                metric: s.to_owned(),
            }),
        }
    }
}

/// Single-column accuracy table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorComparison {
    pub metric: Metric,
    pub values: PolicyValues,
}
