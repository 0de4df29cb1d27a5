//! Counterfactual reward regression for doubly robust slate estimators.
//!
//! [`CounterfactualRegression`] is the contract the orchestration layer
//! invokes once per evaluation call. [`SlateRegressionModel`] implements it
//! with one base [`Regressor`] per position, fitted backwards from the last
//! position:
//!
//! ```text
//! target_{K}   = r_K
//! fit   Q_k(x, a_1..a_k)          on target_k
//! target_{k-1} = r_{k-1} + sum_a pi_e(a | x, a_1..a_{k-1}) * Q_k(x, a_1..a_{k-1}, a)
//! ```
//!
//! Features of position `k` are the round context followed by one-hot blocks
//! of the observed actions above `k` and of the candidate action at `k`.
//!
//! The model refits from scratch on every call; no fitted state survives
//! between calls.

use serde::{Deserialize, Serialize};

use crate::{
    error::EstimatorError,
    inputs::{RegressionInputs, check_len, check_positive, require},
};

/// Produces the counterfactual value table consumed by doubly robust
/// estimators.
pub trait CounterfactualRegression: std::fmt::Debug + Send + Sync {
    /// Returns one value per `(round, position, action)`, flattened in
    /// round, position, action order.
    fn fit_predict(&self, inputs: &RegressionInputs<'_>) -> Result<Vec<f64>, EstimatorError>;
}

/// Per-position base model.
pub trait Regressor: Clone + std::fmt::Debug + Send + Sync {
    fn fit(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<(), EstimatorError>;

    fn predict(&self, x: &[f64]) -> f64;
}

/// Weighting of the per-position regressions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FittingMethod {
    /// Unweighted least squares.
    #[default]
    Normal,
    /// Rows weighted by the cascade importance weight of their position.
    Iw,
}

/// Weighted ridge regression with an unpenalized intercept.
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    lambda: f64,
    intercept: f64,
    coefficients: Vec<f64>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    #[must_use]
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda,
            intercept: 0.0,
            coefficients: vec![],
        }
    }

    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Regressor for RidgeRegression {
    fn fit(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<(), EstimatorError> {
        check_len(y, "y", x.len())?;
        if let Some(w) = sample_weight {
            check_len(w, "sample_weight", x.len())?;
        }
        let Some(dim) = x.first().map(Vec::len) else {
            return Err(EstimatorError::EmptyInput);
        };

        // column 0 is the intercept
        let n = dim + 1;
        let mut gram = vec![vec![0.0; n]; n];
        let mut rhs = vec![0.0; n];
        for (i, (row, &target)) in x.iter().zip(y).enumerate() {
            check_len(row, "x", dim)?;
            let weight = sample_weight.map_or(1.0, |w| w[i]);
            let augmented = || std::iter::once(1.0).chain(row.iter().copied());
            for (j, xj) in augmented().enumerate() {
                rhs[j] += weight * xj * target;
                for (k, xk) in augmented().enumerate() {
                    gram[j][k] += weight * xj * xk;
                }
            }
        }
        for (j, gram_row) in gram.iter_mut().enumerate().skip(1) {
            gram_row[j] += self.lambda;
        }

        let solution = solve_linear_system(gram, rhs)?;
        self.intercept = solution[0];
        self.coefficients = solution[1..].to_vec();
        Ok(())
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(c, v)| c * v)
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, EstimatorError> {
    const EPS: f64 = 1e-12;
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .ok_or(EstimatorError::SingularSystem)?;
        if a[pivot][col].abs() < EPS {
            return Err(EstimatorError::SingularSystem);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail = (row + 1..n).map(|k| a[row][k] * solution[k]).sum::<f64>();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    Ok(solution)
}

/// Backward-fitted per-position regression of slate rewards.
#[derive(Debug, Clone)]
pub struct SlateRegressionModel<R> {
    base_model: R,
    fitting_method: FittingMethod,
}

impl<R> SlateRegressionModel<R>
where
    R: Regressor,
{
    #[must_use]
    pub fn new(base_model: R, fitting_method: FittingMethod) -> Self {
        Self {
            base_model,
            fitting_method,
        }
    }

    #[must_use]
    pub fn fitting_method(&self) -> FittingMethod {
        self.fitting_method
    }
}

const MODEL_NAME: &str = "slate regression model";

/// Feature row of `round` at `position` with `candidate` in the slot.
fn feature_row(
    context: &[f64],
    observed: &[usize],
    position: usize,
    candidate: usize,
    n_actions: usize,
) -> Vec<f64> {
    let mut row = Vec::with_capacity(context.len() + (position + 1) * n_actions);
    row.extend_from_slice(context);
    for &a in observed[..position].iter().chain([&candidate]) {
        let start = row.len();
        row.resize(start + n_actions, 0.0);
        row[start + a] = 1.0;
    }
    row
}

impl<R> CounterfactualRegression for SlateRegressionModel<R>
where
    R: Regressor,
{
    fn fit_predict(&self, inputs: &RegressionInputs<'_>) -> Result<Vec<f64>, EstimatorError> {
        let context = require(inputs.context, MODEL_NAME, "context")?;
        let action = require(inputs.action, MODEL_NAME, "action")?;
        let action_dist = require(
            inputs.evaluation_policy_action_dist,
            MODEL_NAME,
            "evaluation_policy_action_dist",
        )?;

        let len_list = inputs.len_list;
        let n_actions = inputs.n_unique_action;
        let n_rows = inputs.reward.len();
        if len_list == 0 || n_rows == 0 {
            return Err(EstimatorError::EmptyInput);
        }
        let n_rounds = n_rows / len_list;
        check_len(context, "context", n_rounds)?;
        check_len(action, "action", n_rounds * len_list)?;
        check_len(action_dist, "evaluation_policy_action_dist", n_rows * n_actions)?;
        if let Some(&bad) = action.iter().find(|&&a| a >= n_actions) {
            return Err(EstimatorError::InvalidAction {
                action: bad,
                n_unique_action: n_actions,
            });
        }

        let importance_weights = match self.fitting_method {
            FittingMethod::Normal => None,
            FittingMethod::Iw => {
                let behavior = require(inputs.pscore_cascade, MODEL_NAME, "pscore_cascade")?;
                let evaluation = require(
                    inputs.evaluation_policy_pscore_cascade,
                    MODEL_NAME,
                    "evaluation_policy_pscore_cascade",
                )?;
                check_len(behavior, "pscore_cascade", n_rows)?;
                check_len(evaluation, "evaluation_policy_pscore_cascade", n_rows)?;
                check_positive(behavior, "pscore_cascade")?;
                Some(
                    evaluation
                        .iter()
                        .zip(behavior)
                        .map(|(e, b)| e / b)
                        .collect::<Vec<_>>(),
                )
            }
        };

        let slates = action.chunks(len_list).collect::<Vec<_>>();
        let mut q_hat = vec![0.0; n_rows * n_actions];
        let mut target = (0..n_rounds)
            .map(|round| inputs.reward[round * len_list + len_list - 1])
            .collect::<Vec<_>>();

        for position in (0..len_list).rev() {
            let x = (0..n_rounds)
                .map(|round| {
                    let observed = slates[round];
                    feature_row(&context[round], observed, position, observed[position], n_actions)
                })
                .collect::<Vec<_>>();
            let sample_weight = importance_weights.as_ref().map(|w| {
                (0..n_rounds)
                    .map(|round| w[round * len_list + position])
                    .collect::<Vec<_>>()
            });

            let mut model = self.base_model.clone();
            model.fit(&x, &target, sample_weight.as_deref())?;
            tracing::trace!(position, n_rounds, "fitted slate regression position");

            for round in 0..n_rounds {
                let row = round * len_list + position;
                let observed = slates[round];
                let mut expected = 0.0;
                for candidate in 0..n_actions {
                    let features =
                        feature_row(&context[round], observed, position, candidate, n_actions);
                    let q = model.predict(&features);
                    q_hat[row * n_actions + candidate] = q;
                    expected += q * action_dist[row * n_actions + candidate];
                }
                if position > 0 {
                    target[round] = inputs.reward[row - 1] + expected;
                }
            }
        }
        Ok(q_hat)
    }
}
