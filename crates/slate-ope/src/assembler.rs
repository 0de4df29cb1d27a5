//! Builds the per-call estimator input bundle.
//!
//! Assembly runs once per evaluation call. It checks the evaluation-policy
//! arrays, runs the counterfactual regression model when one is configured,
//! and keeps its output alongside borrowed views of the logged feedback. All
//! estimators of the call then read the same [`EstimatorInputs`].

use slate_ope_estimator::{CounterfactualRegression, EstimatorError, EstimatorInputs, RegressionInputs};

use crate::{
    error::{ConfigurationError, OpeError},
    feedback::{FeedbackSummary, LoggedFeedback},
    policy::EvaluationPolicy,
};

/// Owned result of [`assemble`]; hands out borrowed [`EstimatorInputs`].
#[derive(Debug)]
pub struct AssembledInputs<'a> {
    feedback: &'a LoggedFeedback,
    policy: &'a EvaluationPolicy,
    summary: FeedbackSummary,
    slate_id: &'a [usize],
    position: &'a [usize],
    reward: &'a [f64],
    q_hat: Option<Vec<f64>>,
    is_factorizable: bool,
}

impl AssembledInputs<'_> {
    #[must_use]
    pub fn estimator_inputs(&self) -> EstimatorInputs<'_> {
        EstimatorInputs {
            slate_id: self.slate_id,
            action: self.feedback.action.as_deref(),
            reward: self.reward,
            position: self.position,
            pscore: self.feedback.pscore.as_deref(),
            pscore_item_position: self.feedback.pscore_item_position.as_deref(),
            pscore_cascade: self.feedback.pscore_cascade.as_deref(),
            evaluation_policy_pscore: self.policy.pscore.as_deref(),
            evaluation_policy_pscore_item_position: self.policy.pscore_item_position.as_deref(),
            evaluation_policy_pscore_cascade: self.policy.pscore_cascade.as_deref(),
            evaluation_policy_action_dist: self.policy.action_dist.as_deref(),
            q_hat_for_counterfactual_actions: self.q_hat.as_deref(),
            len_list: self.summary.len_list,
            n_unique_action: self.summary.n_unique_action,
            is_factorizable: self.is_factorizable,
        }
    }

    /// Counterfactual value table, when a regression model ran.
    #[must_use]
    pub fn q_hat(&self) -> Option<&[f64]> {
        self.q_hat.as_deref()
    }
}

/// Validates `policy` and builds the bundle for one evaluation call.
///
/// `summary` must come from [`FeedbackSummary::from_feedback`] on the same
/// `feedback`.
pub fn assemble<'a>(
    feedback: &'a LoggedFeedback,
    summary: FeedbackSummary,
    policy: &'a EvaluationPolicy,
    regression_model: Option<&dyn CounterfactualRegression>,
    is_factorizable: bool,
) -> Result<AssembledInputs<'a>, OpeError> {
    policy.validate(&summary)?;

    let slate_id = feedback
        .slate_id
        .as_deref()
        .ok_or(ConfigurationError::MissingKey { key: "slate_id" })?;
    let position = feedback
        .position
        .as_deref()
        .ok_or(ConfigurationError::MissingKey { key: "position" })?;
    let reward = feedback
        .reward
        .as_deref()
        .ok_or(ConfigurationError::MissingKey { key: "reward" })?;

    let q_hat = match regression_model {
        Some(model) => {
            tracing::debug!(n_rows = summary.n_rows, "fitting counterfactual regression model");
            let q_hat = model.fit_predict(&RegressionInputs {
                context: feedback.context.as_deref(),
                action: feedback.action.as_deref(),
                reward,
                pscore_cascade: feedback.pscore_cascade.as_deref(),
                evaluation_policy_pscore_cascade: policy.pscore_cascade.as_deref(),
                evaluation_policy_action_dist: policy.action_dist.as_deref(),
                len_list: summary.len_list,
                n_unique_action: summary.n_unique_action,
            })?;
            let expected = summary.n_rows * summary.n_unique_action;
            if q_hat.len() != expected {
                return Err(EstimatorError::LengthMismatch {
                    input: "q_hat_for_counterfactual_actions",
                    expected,
                    actual: q_hat.len(),
                }
                .into());
            }
            Some(q_hat)
        }
        None => None,
    };

    Ok(AssembledInputs {
        feedback,
        policy,
        summary,
        slate_id,
        position,
        reward,
        q_hat,
        is_factorizable,
    })
}
