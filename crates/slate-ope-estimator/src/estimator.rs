//! The estimator capability contract.
//!
//! Every off-policy estimator, whatever its weighting scheme, exposes a name,
//! a point estimate and a bootstrap interval over the same
//! [`EstimatorInputs`] bundle. The orchestration layer only ever talks to
//! estimators through [`SlateOffPolicyEstimator`].
//!
//! # Round-level aggregation
//!
//! Estimators shipped in this crate compute one estimated reward per logged
//! row, sum the rows of each slate into a round reward, and average the round
//! rewards. The bootstrap resamples those round rewards, so the resampling
//! unit is always the slate, never the individual row.

use std::{collections::BTreeMap, fmt};

use slate_ope_stats::bootstrap::{
    BootstrapConfig, ConfidenceInterval, estimate_confidence_interval_by_bootstrap,
};

use crate::{error::EstimatorError, inputs::EstimatorInputs};

pub trait SlateOffPolicyEstimator: fmt::Debug + Send + Sync {
    /// Registry key of this estimator.
    fn name(&self) -> &str;

    fn clone_boxed(&self) -> BoxedSlateEstimator;

    /// Point estimate of the evaluation policy value.
    fn estimate_policy_value(&self, inputs: &EstimatorInputs<'_>) -> Result<f64, EstimatorError>;

    /// Bootstrap interval of the evaluation policy value.
    ///
    /// `config` has already been validated by the caller.
    fn estimate_interval(
        &self,
        inputs: &EstimatorInputs<'_>,
        config: &BootstrapConfig,
    ) -> Result<ConfidenceInterval, EstimatorError>;
}

pub type BoxedSlateEstimator = Box<dyn SlateOffPolicyEstimator>;

impl Clone for BoxedSlateEstimator {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Sums per-row estimated rewards into one value per slate.
///
/// Slates are returned in ascending `slate_id` order.
#[must_use]
pub fn aggregate_round_rewards(slate_id: &[usize], row_rewards: &[f64]) -> Vec<f64> {
    let mut rounds = BTreeMap::<usize, f64>::new();
    for (&id, &reward) in slate_id.iter().zip(row_rewards) {
        *rounds.entry(id).or_default() += reward;
    }
    rounds.into_values().collect()
}

/// `sum(row_rewards) / number_of_distinct_slates`.
pub fn policy_value_from_row_rewards(
    slate_id: &[usize],
    row_rewards: &[f64],
) -> Result<f64, EstimatorError> {
    let rounds = aggregate_round_rewards(slate_id, row_rewards);
    if rounds.is_empty() {
        return Err(EstimatorError::EmptyInput);
    }
    Ok(slate_ope_stats::descriptive::mean(&rounds))
}

/// Bootstrap interval over the round rewards built from `row_rewards`.
pub fn interval_from_row_rewards(
    slate_id: &[usize],
    row_rewards: &[f64],
    config: &BootstrapConfig,
) -> Result<ConfidenceInterval, EstimatorError> {
    let rounds = aggregate_round_rewards(slate_id, row_rewards);
    if rounds.is_empty() {
        return Err(EstimatorError::EmptyInput);
    }
    Ok(estimate_confidence_interval_by_bootstrap(&rounds, config)?)
}
