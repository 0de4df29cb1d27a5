//! Inverse probability weighting estimators for slates.
//!
//! The three estimators differ only in which probability pair forms the
//! importance weight of a logged row:
//!
//! | Scheme | Behavior probability | Evaluation probability | Assumption |
//! |--------|----------------------|------------------------|------------|
//! | [`WeightingScheme::Standard`] (SIPS) | `pscore` | `evaluation_policy_pscore` | none |
//! | [`WeightingScheme::IndependentItem`] (IIPS) | `pscore_item_position` | `evaluation_policy_pscore_item_position` | slot rewards depend only on their own action |
//! | [`WeightingScheme::RewardInteraction`] (RIPS) | `pscore_cascade` | `evaluation_policy_pscore_cascade` | slot rewards depend only on actions above them |
//!
//! ```text
//! row_reward = reward * evaluation_probability / behavior_probability
//! V_hat      = sum(row_reward) / n_slates
//! ```
//!
//! Stronger assumptions give smaller weights and lower variance, at the risk
//! of bias when the assumption does not hold.
//!
//! # Self-normalization
//!
//! The self-normalized variants divide every weight by the mean weight of its
//! position, trading a small bias for bounded variance.

use slate_ope_stats::bootstrap::{BootstrapConfig, ConfidenceInterval};

use crate::{
    error::EstimatorError,
    estimator::{
        BoxedSlateEstimator, SlateOffPolicyEstimator, interval_from_row_rewards,
        policy_value_from_row_rewards,
    },
    inputs::{EstimatorInputs, check_len, check_positive, require},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum WeightingScheme {
    /// Whole-slate probabilities.
    Standard,
    /// Per-position marginal probabilities.
    IndependentItem,
    /// Probabilities of the prefix ending at the position.
    RewardInteraction,
}

impl WeightingScheme {
    fn default_name(self, self_normalized: bool) -> &'static str {
        match (self, self_normalized) {
            (Self::Standard, false) => "sips",
            (Self::IndependentItem, false) => "iips",
            (Self::RewardInteraction, false) => "rips",
            (Self::Standard, true) => "snsips",
            (Self::IndependentItem, true) => "sniips",
            (Self::RewardInteraction, true) => "snrips",
        }
    }

    fn select<'a>(
        self,
        inputs: &EstimatorInputs<'a>,
    ) -> (
        (Option<&'a [f64]>, &'static str),
        (Option<&'a [f64]>, &'static str),
    ) {
        match self {
            Self::Standard => (
                (inputs.pscore, "pscore"),
                (inputs.evaluation_policy_pscore, "evaluation_policy_pscore"),
            ),
            Self::IndependentItem => (
                (inputs.pscore_item_position, "pscore_item_position"),
                (
                    inputs.evaluation_policy_pscore_item_position,
                    "evaluation_policy_pscore_item_position",
                ),
            ),
            Self::RewardInteraction => (
                (inputs.pscore_cascade, "pscore_cascade"),
                (
                    inputs.evaluation_policy_pscore_cascade,
                    "evaluation_policy_pscore_cascade",
                ),
            ),
        }
    }
}

/// Slate IPS estimator parameterized by weighting scheme.
#[derive(Debug, Clone)]
pub struct SlateInverseProbabilityWeighting {
    name: String,
    scheme: WeightingScheme,
    self_normalized: bool,
}

impl SlateInverseProbabilityWeighting {
    #[must_use]
    pub fn new(scheme: WeightingScheme, self_normalized: bool) -> Self {
        Self {
            name: scheme.default_name(self_normalized).to_owned(),
            scheme,
            self_normalized,
        }
    }

    /// SIPS.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(WeightingScheme::Standard, false)
    }

    /// IIPS.
    #[must_use]
    pub fn independent_item() -> Self {
        Self::new(WeightingScheme::IndependentItem, false)
    }

    /// RIPS.
    #[must_use]
    pub fn reward_interaction() -> Self {
        Self::new(WeightingScheme::RewardInteraction, false)
    }

    /// Overrides the registry key.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn scheme(&self) -> WeightingScheme {
        self.scheme
    }

    #[must_use]
    pub fn is_self_normalized(&self) -> bool {
        self.self_normalized
    }

    /// Estimated reward of every logged row.
    pub fn estimate_row_rewards(&self, inputs: &EstimatorInputs<'_>) -> Result<Vec<f64>, EstimatorError> {
        let ((behavior, behavior_name), (evaluation, evaluation_name)) = self.scheme.select(inputs);
        let behavior = require(behavior, &self.name, behavior_name)?;
        let evaluation = require(evaluation, &self.name, evaluation_name)?;

        let n_rows = inputs.n_rows();
        check_len(inputs.slate_id, "slate_id", n_rows)?;
        check_len(inputs.position, "position", n_rows)?;
        check_len(behavior, behavior_name, n_rows)?;
        check_len(evaluation, evaluation_name, n_rows)?;
        check_positive(behavior, behavior_name)?;

        let mut weights = evaluation
            .iter()
            .zip(behavior)
            .map(|(e, b)| e / b)
            .collect::<Vec<_>>();
        if self.self_normalized {
            normalize_by_position(&mut weights, inputs.position, inputs.len_list);
        }
        Ok(weights
            .iter()
            .zip(inputs.reward)
            .map(|(w, r)| w * r)
            .collect())
    }
}

/// Divides each weight by the mean weight of its position.
///
/// Positions whose mean weight is zero keep zero weights.
pub(crate) fn normalize_by_position(weights: &mut [f64], position: &[usize], len_list: usize) {
    let mut sums = vec![0.0; len_list];
    let mut counts = vec![0_usize; len_list];
    for (&w, &p) in weights.iter().zip(position) {
        if p < len_list {
            sums[p] += w;
            counts[p] += 1;
        }
    }
    #[expect(clippy::cast_precision_loss)]
    let means = sums
        .iter()
        .zip(&counts)
        .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .collect::<Vec<_>>();
    for (w, &p) in weights.iter_mut().zip(position) {
        let mean = means.get(p).copied().unwrap_or(0.0);
        *w = if mean == 0.0 { 0.0 } else { *w / mean };
    }
}

impl SlateOffPolicyEstimator for SlateInverseProbabilityWeighting {
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
