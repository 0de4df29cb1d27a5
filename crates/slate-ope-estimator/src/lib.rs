//! Off-policy estimators for slate recommendation.
//!
//! This crate defines the contracts the evaluation engine talks to and ships
//! the standard slate estimators behind them:
//!
//! 1. **Estimator contract** ([`estimator`]) - [`SlateOffPolicyEstimator`]: a name, a
//!    point estimate and a bootstrap interval over a shared [`EstimatorInputs`] bundle.
//!
//! 2. **Importance weighting** ([`ips`]) - SIPS, IIPS and RIPS, plus their
//!    self-normalized variants, selected by [`ips::WeightingScheme`].
//!
//! 3. **Doubly robust** ([`cascade_dr`]) - Cascade-DR, combining cascade weights with
//!    a counterfactual value table.
//!
//! 4. **Regression** ([`regression`]) - [`CounterfactualRegression`] contract and the
//!    backward-fitted [`regression::SlateRegressionModel`] producing that table.
//!
//! # Architecture
//!
//! ```text
//! Evaluation engine (slate-ope)
//!     ↓ builds once per call
//! EstimatorInputs ← CounterfactualRegression::fit_predict
//!     ↓ shared by reference
//! SlateOffPolicyEstimator (SIPS / IIPS / RIPS / Cascade-DR / ...)
//!     ↓ returns
//! point estimate, ConfidenceInterval
//! ```
//!
//! # Design Principles
//!
//! ## Presence, not falsiness
//!
//! Inputs the caller did not provide are `None`. Estimators report a
//! [`EstimatorError::MissingInput`] naming the array they needed instead of
//! silently treating it as zero.
//!
//! ## Slate as the resampling unit
//!
//! Row-level estimated rewards are summed per slate before averaging or
//! bootstrapping, so intervals reflect round-to-round variation.
//!
//! # Current Limitations
//!
//! - **Ridge base model only**: the shipped [`regression::Regressor`] is linear; any
//!   other model must implement the trait.
//! - **No self-normalized Cascade-DR**.

pub mod cascade_dr;
pub mod error;
pub mod estimator;
pub mod inputs;
pub mod ips;
pub mod regression;

pub use self::{
    error::EstimatorError,
    estimator::{BoxedSlateEstimator, SlateOffPolicyEstimator},
    inputs::{EstimatorInputs, RegressionInputs},
    regression::CounterfactualRegression,
};
pub use slate_ope_stats::bootstrap::{BootstrapConfig, ConfidenceInterval};
