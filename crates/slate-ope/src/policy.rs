use serde::{Deserialize, Serialize};

use crate::{error::InvalidArgumentError, feedback::FeedbackSummary};

/// Probabilities the evaluation policy assigns to the logged slates.
///
/// Arrays mirror the logged probability fields row for row. `action_dist`
/// enumerates the probability of every candidate action at every row
/// (`n_rows * n_unique_action` elements) and is only needed by doubly robust
/// estimators and the regression model.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationPolicy {
    pub pscore: Option<Vec<f64>>,
    pub pscore_item_position: Option<Vec<f64>>,
    pub pscore_cascade: Option<Vec<f64>>,
    pub action_dist: Option<Vec<f64>>,
}

impl EvaluationPolicy {
    /// Checks that at least one scalar probability array is present and that
    /// every present array matches the logged feedback and holds only finite
    /// values.
    pub fn validate(&self, summary: &FeedbackSummary) -> Result<(), InvalidArgumentError> {
        if self.pscore.is_none() && self.pscore_item_position.is_none() && self.pscore_cascade.is_none()
        {
            return Err(InvalidArgumentError::MissingEvaluationPscore);
        }
        let per_row = [
            (&self.pscore, "evaluation_policy_pscore"),
            (
                &self.pscore_item_position,
                "evaluation_policy_pscore_item_position",
            ),
            (&self.pscore_cascade, "evaluation_policy_pscore_cascade"),
        ];
        for (values, field) in per_row {
            check_len(values.as_deref(), field, summary.n_rows)?;
            check_finite(values.as_deref(), field)?;
        }
        let field = "evaluation_policy_action_dist";
        check_len(
            self.action_dist.as_deref(),
            field,
            summary.n_rows * summary.n_unique_action,
        )?;
        check_finite(self.action_dist.as_deref(), field)
    }
}

fn check_finite(values: Option<&[f64]>, field: &'static str) -> Result<(), InvalidArgumentError> {
    match values.and_then(|v| v.iter().position(|p| !p.is_finite())) {
        Some(index) => Err(InvalidArgumentError::NonFiniteProbability { field, index }),
        None => Ok(()),
    }
}

fn check_len(
    values: Option<&[f64]>,
    field: &'static str,
    expected: usize,
) -> Result<(), InvalidArgumentError> {
    match values {
        Some(v) if v.len() != expected => Err(InvalidArgumentError::LengthMismatch {
            field,
            expected,
            actual: v.len(),
        }),
        _ => Ok(()),
    }
}
