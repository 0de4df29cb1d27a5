//! Cascade doubly robust estimator.
//!
//! Combines cascade importance weights with a fitted counterfactual value
//! table `q_hat(x, a_1..a_{k-1}, a)`. For a row at position `k`:
//!
//! ```text
//! w_k        = evaluation_pscore_cascade_k / pscore_cascade_k
//! w_{k-1}    = 1 when k is the first position
//! row_reward = w_k * (r_k - q_hat(observed a_k))
//!            + w_{k-1} * sum_a pi_e(a | x, a_1..a_{k-1}) * q_hat(a)
//! ```
//!
//! The regression term removes most of the variance of the cascade IPS
//! estimator when `q_hat` is accurate, and the weighted residual keeps the
//! estimate unbiased when it is not.

use slate_ope_stats::bootstrap::{BootstrapConfig, ConfidenceInterval};

use crate::{
    error::EstimatorError,
    estimator::{
        BoxedSlateEstimator, SlateOffPolicyEstimator, interval_from_row_rewards,
        policy_value_from_row_rewards,
    },
    inputs::{EstimatorInputs, check_len, check_positive, require},
};

#[derive(Debug, Clone)]
pub struct SlateCascadeDoublyRobust {
    name: String,
}

impl Default for SlateCascadeDoublyRobust {
    fn default() -> Self {
        Self::new()
    }
}

impl SlateCascadeDoublyRobust {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "cascade-dr".to_owned(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn estimate_row_rewards(&self, inputs: &EstimatorInputs<'_>) -> Result<Vec<f64>, EstimatorError> {
        let action = require(inputs.action, &self.name, "action")?;
        let behavior = require(inputs.pscore_cascade, &self.name, "pscore_cascade")?;
        let evaluation = require(
            inputs.evaluation_policy_pscore_cascade,
            &self.name,
            "evaluation_policy_pscore_cascade",
        )?;
        let action_dist = require(
            inputs.evaluation_policy_action_dist,
            &self.name,
            "evaluation_policy_action_dist",
        )?;
        let q_hat = require(
            inputs.q_hat_for_counterfactual_actions,
            &self.name,
            "q_hat_for_counterfactual_actions",
        )?;

        let n_rows = inputs.n_rows();
        let n_actions = inputs.n_unique_action;
        check_len(inputs.position, "position", n_rows)?;
        check_len(action, "action", n_rows)?;
        check_len(behavior, "pscore_cascade", n_rows)?;
        check_len(evaluation, "evaluation_policy_pscore_cascade", n_rows)?;
        check_len(action_dist, "evaluation_policy_action_dist", n_rows * n_actions)?;
        check_len(q_hat, "q_hat_for_counterfactual_actions", n_rows * n_actions)?;
        check_positive(behavior, "pscore_cascade")?;
        if let Some(&bad) = action.iter().find(|&&a| a >= n_actions) {
            return Err(EstimatorError::InvalidAction {
                action: bad,
                n_unique_action: n_actions,
            });
        }

        let weights = evaluation
            .iter()
            .zip(behavior)
            .map(|(e, b)| e / b)
            .collect::<Vec<_>>();

        let rows = (0..n_rows)
            .map(|row| {
                let q_row = &q_hat[row * n_actions..(row + 1) * n_actions];
                let dist_row = &action_dist[row * n_actions..(row + 1) * n_actions];
                let q_observed = q_row[action[row]];
                let q_expected = q_row.iter().zip(dist_row).map(|(q, p)| q * p).sum::<f64>();
                let prev_weight = if inputs.position[row] == 0 || row == 0 {
                    1.0
                } else {
                    weights[row - 1]
                };
                weights[row] * (inputs.reward[row] - q_observed) + prev_weight * q_expected
            })
            .collect();
        Ok(rows)
    }
}

impl SlateOffPolicyEstimator for SlateCascadeDoublyRobust {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_boxed(&self) -> BoxedSlateEstimator {
        Box::new(self.clone())
    }

    fn estimate_policy_value(&self, inputs: &EstimatorInputs<'_>) -> Result<f64, EstimatorError> {
        let rows = self.estimate_row_rewards(inputs)?;
        policy_value_from_row_rewards(inputs.slate_id, &rows)
    }

    fn estimate_interval(
        &self,
        inputs: &EstimatorInputs<'_>,
        config: &BootstrapConfig,
    ) -> Result<ConfidenceInterval, EstimatorError> {
        let rows = self.estimate_row_rewards(inputs)?;
        interval_from_row_rewards(inputs.slate_id, &rows, config)
    }
}
