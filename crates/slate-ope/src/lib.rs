//! Off-policy evaluation of slate recommendation policies.
//!
//! Given feedback logged under a behavior policy and the probabilities a new
//! evaluation policy assigns to the logged slates, this crate estimates the
//! value the evaluation policy would have achieved, with a set of estimators
//! side by side:
//!
//! 1. **Feedback validation** ([`feedback`]) - required keys, slate layout,
//!    derived `n_rounds` / `len_list` / `n_unique_action`.
//!
//! 2. **Estimator registry** ([`registry`]) - name-keyed, ordered, with
//!    last-write-wins or strict duplicate handling.
//!
//! 3. **Input assembly** ([`assembler`]) - one shared, read-only bundle per
//!    call, including the counterfactual regression output.
//!
//! 4. **Dispatch and summaries** ([`evaluation`], [`summary`]) - point
//!    estimates, bootstrap intervals, values relative to the behavior policy
//!    and accuracy against a known ground truth.
//!
//! # Example
//!
//! ```
//! use slate_ope::{EvaluationPolicy, LoggedFeedback, SlateOffPolicyEvaluation};
//! use slate_ope_estimator::{BoxedSlateEstimator, ips::SlateInverseProbabilityWeighting};
//!
//! let feedback = LoggedFeedback {
//!     slate_id: Some(vec![0, 0, 1, 1]),
//!     position: Some(vec![0, 1, 0, 1]),
//!     reward: Some(vec![1.0, 0.0, 1.0, 1.0]),
//!     pscore: Some(vec![0.5; 4]),
//!     ..LoggedFeedback::default()
//! };
//! let estimators: Vec<BoxedSlateEstimator> =
//!     vec![Box::new(SlateInverseProbabilityWeighting::standard())];
//! let ope = SlateOffPolicyEvaluation::new(&feedback, estimators).unwrap();
//! let policy = EvaluationPolicy {
//!     pscore: Some(vec![0.5; 4]),
//!     ..EvaluationPolicy::default()
//! };
//! let values = ope.estimate_policy_values(&policy).unwrap();
//! assert!((values.get("sips").unwrap() - 1.5).abs() < 1e-12);
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod feedback;
pub mod policy;
pub mod registry;
pub mod summary;
pub mod warning;

pub use self::{
    config::{EvaluationConfig, ExecutionMode},
    error::{ConfigurationError, InvalidArgumentError, OpeError},
    evaluation::{SlateOffPolicyEvaluation, SlateOffPolicyEvaluationBuilder},
    feedback::{FeedbackSummary, LoggedFeedback},
    policy::EvaluationPolicy,
    registry::{EstimatorRegistry, RegistrationMode},
    summary::{
        EstimatorComparison, EstimatorTable, Metric, PolicyValueIntervals, PolicyValueSummary,
        PolicyValueSummaryRow, PolicyValues,
    },
    warning::{TracingWarningSink, WarningSink},
};
