//! Per-call input bundles handed to estimators and regression models.
//!
//! Both bundles only borrow. The orchestration layer builds them once per
//! evaluation call and shares them by reference, so nothing downstream can
//! mutate the logged data or the evaluation-policy arrays.
//!
//! Optional arrays stay `None` when the caller did not provide them. An
//! absent array is never replaced by zeros; estimators branch on presence.
//!
//! # Layout
//!
//! Per-row arrays have `n_rounds * len_list` elements, ordered by round and
//! then by position. Per-action arrays (`evaluation_policy_action_dist`,
//! `q_hat_for_counterfactual_actions`) have
//! `n_rounds * len_list * n_unique_action` elements, indexed by
//! `(row * n_unique_action) + action`.

use crate::error::EstimatorError;

/// Everything an estimator may read during one evaluation call.
#[derive(Debug, Clone, Copy)]
pub struct EstimatorInputs<'a> {
    pub slate_id: &'a [usize],
    pub action: Option<&'a [usize]>,
    pub reward: &'a [f64],
    pub position: &'a [usize],
    /// Behavior policy probability of the whole slate.
    pub pscore: Option<&'a [f64]>,
    /// Behavior policy marginal probability of the action at its slot.
    pub pscore_item_position: Option<&'a [f64]>,
    /// Behavior policy probability of the slate prefix up to the slot.
    pub pscore_cascade: Option<&'a [f64]>,
    pub evaluation_policy_pscore: Option<&'a [f64]>,
    pub evaluation_policy_pscore_item_position: Option<&'a [f64]>,
    pub evaluation_policy_pscore_cascade: Option<&'a [f64]>,
    pub evaluation_policy_action_dist: Option<&'a [f64]>,
    /// Output of the counterfactual regression model, when one is configured.
    pub q_hat_for_counterfactual_actions: Option<&'a [f64]>,
    pub len_list: usize,
    pub n_unique_action: usize,
    /// Passed through from the evaluation configuration; not interpreted by
    /// the orchestration layer.
    pub is_factorizable: bool,
}

impl EstimatorInputs<'_> {
    /// Number of logged rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.reward.len()
    }
}

/// Arguments of [`CounterfactualRegression::fit_predict`](crate::regression::CounterfactualRegression::fit_predict).
#[derive(Debug, Clone, Copy)]
pub struct RegressionInputs<'a> {
    /// One feature row per round.
    pub context: Option<&'a [Vec<f64>]>,
    pub action: Option<&'a [usize]>,
    pub reward: &'a [f64],
    pub pscore_cascade: Option<&'a [f64]>,
    pub evaluation_policy_pscore_cascade: Option<&'a [f64]>,
    pub evaluation_policy_action_dist: Option<&'a [f64]>,
    pub len_list: usize,
    pub n_unique_action: usize,
}

/// Unwraps an optional input or reports which estimator needed it.
pub(crate) fn require<'a, T: ?Sized>(
    value: Option<&'a T>,
    estimator: &str,
    input: &'static str,
) -> Result<&'a T, EstimatorError> {
    value.ok_or_else(|| EstimatorError::MissingInput {
        estimator: estimator.to_owned(),
        input,
    })
}

pub(crate) fn check_len<T>(
    values: &[T],
    input: &'static str,
    expected: usize,
) -> Result<(), EstimatorError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(EstimatorError::LengthMismatch {
            input,
            expected,
            actual: values.len(),
        })
    }
}

pub(crate) fn check_positive(values: &[f64], input: &'static str) -> Result<(), EstimatorError> {
    // NaN is rejected as well
    if values.iter().all(|&p| p > 0.0) {
        Ok(())
    } else {
        Err(EstimatorError::NonPositivePscore { input })
    }
}
