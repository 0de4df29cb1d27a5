//! The evaluation object tying feedback, estimators and summaries together.

use std::{sync::Arc, thread};

use slate_ope_estimator::{
    BootstrapConfig, BoxedSlateEstimator, CounterfactualRegression, EstimatorError,
    SlateOffPolicyEstimator,
};

use crate::{
    assembler::{AssembledInputs, assemble},
    config::{EvaluationConfig, ExecutionMode},
    error::{ConfigurationError, InvalidArgumentError, OpeError},
    feedback::{FeedbackSummary, LoggedFeedback},
    policy::EvaluationPolicy,
    registry::{EstimatorRegistry, RegistrationMode},
    summary::{
        EstimatorComparison, EstimatorTable, Metric, PolicyValueIntervals, PolicyValueSummary,
        PolicyValues, relative_policy_values,
    },
    warning::{TracingWarningSink, WarningSink},
};

/// Off-policy evaluation of slate policies over one logged dataset.
///
/// Construct with [`SlateOffPolicyEvaluation::builder`]. The logged feedback
/// is validated once at construction and borrowed for the lifetime of the
/// evaluation; each `estimate_*`/`summarize_*` call assembles a fresh input
/// bundle from it and the supplied [`EvaluationPolicy`].
///
/// The regression model is optional. Without one, no estimator receives
/// `q_hat_for_counterfactual_actions`, so estimators that need it (such as
/// Cascade-DR) fail with [`EstimatorError::MissingInput`]. Configure one
/// with [`SlateOffPolicyEvaluationBuilder::with_regression_model`].
#[derive(Debug)]
pub struct SlateOffPolicyEvaluation<'a> {
    feedback: &'a LoggedFeedback,
    summary: FeedbackSummary,
    registry: EstimatorRegistry,
    regression_model: Option<Arc<dyn CounterfactualRegression>>,
    is_factorizable: bool,
    execution_mode: ExecutionMode,
    warning_sink: Arc<dyn WarningSink>,
}

#[derive(Debug)]
pub struct SlateOffPolicyEvaluationBuilder<'a> {
    feedback: &'a LoggedFeedback,
    estimators: Vec<BoxedSlateEstimator>,
    regression_model: Option<Arc<dyn CounterfactualRegression>>,
    registration_mode: RegistrationMode,
    is_factorizable: bool,
    execution_mode: ExecutionMode,
    warning_sink: Arc<dyn WarningSink>,
}

impl<'a> SlateOffPolicyEvaluationBuilder<'a> {
    #[must_use]
    pub fn estimator(mut self, estimator: BoxedSlateEstimator) -> Self {
        self.estimators.push(estimator);
        self
    }

    #[must_use]
    pub fn estimators<I>(mut self, estimators: I) -> Self
    where
        I: IntoIterator<Item = BoxedSlateEstimator>,
    {
        self.estimators.extend(estimators);
        self
    }

    #[must_use]
    pub fn with_regression_model(mut self, model: Arc<dyn CounterfactualRegression>) -> Self {
        self.regression_model = Some(model);
        self
    }

    #[must_use]
    pub fn registration_mode(mut self, mode: RegistrationMode) -> Self {
        self.registration_mode = mode;
        self
    }

    #[must_use]
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    #[must_use]
    pub fn is_factorizable(mut self, is_factorizable: bool) -> Self {
        self.is_factorizable = is_factorizable;
        self
    }

    #[must_use]
    pub fn warning_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.warning_sink = sink;
        self
    }

    /// Applies the engine-level settings of `config`.
    ///
    /// Bootstrap and metric settings are per call and are not stored.
    #[must_use]
    pub fn config(self, config: &EvaluationConfig) -> Self {
        self.registration_mode(config.registration_mode)
            .execution_mode(config.execution_mode)
            .is_factorizable(config.is_factorizable)
    }

    /// Validates the feedback and registers the estimators.
    pub fn build(self) -> Result<SlateOffPolicyEvaluation<'a>, ConfigurationError> {
        let summary = FeedbackSummary::from_feedback(self.feedback)?;
        let registry = EstimatorRegistry::new(self.estimators, self.registration_mode)?;
        tracing::debug!(
            n_rounds = summary.n_rounds,
            len_list = summary.len_list,
            n_unique_action = summary.n_unique_action,
            n_estimators = registry.len(),
            "evaluation configured"
        );
        Ok(SlateOffPolicyEvaluation {
            feedback: self.feedback,
            summary,
            registry,
            regression_model: self.regression_model,
            is_factorizable: self.is_factorizable,
            execution_mode: self.execution_mode,
            warning_sink: self.warning_sink,
        })
    }
}

impl<'a> SlateOffPolicyEvaluation<'a> {
    #[must_use]
    pub fn builder(feedback: &'a LoggedFeedback) -> SlateOffPolicyEvaluationBuilder<'a> {
        SlateOffPolicyEvaluationBuilder {
            feedback,
            estimators: vec![],
            regression_model: None,
            registration_mode: RegistrationMode::default(),
            is_factorizable: false,
            execution_mode: ExecutionMode::default(),
            warning_sink: Arc::new(TracingWarningSink),
        }
    }

    /// Shorthand for a builder with default settings.
    pub fn new<I>(feedback: &'a LoggedFeedback, estimators: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = BoxedSlateEstimator>,
    {
        Self::builder(feedback).estimators(estimators).build()
    }

    #[must_use]
    pub fn summary(&self) -> FeedbackSummary {
        self.summary
    }

    #[must_use]
    pub fn registry(&self) -> &EstimatorRegistry {
        &self.registry
    }

    /// On-policy value of the behavior policy: `sum(reward) / n_rounds`.
    #[must_use]
    pub fn behavior_policy_value(&self) -> f64 {
        self.feedback.behavior_policy_value()
    }

    fn assemble<'p>(&self, policy: &'p EvaluationPolicy) -> Result<AssembledInputs<'p>, OpeError>
    where
        'a: 'p,
    {
        assemble(
            self.feedback,
            self.summary,
            policy,
            self.regression_model.as_deref(),
            self.is_factorizable,
        )
    }

    /// Runs `f` on every registered estimator and collects the results in
    /// registry order. The first failure in registry order is returned.
    fn run_estimators<T, F>(&self, f: F) -> Result<EstimatorTable<T>, OpeError>
    where
        T: Send,
        F: Fn(&dyn SlateOffPolicyEstimator) -> Result<T, EstimatorError> + Sync,
    {
        let results = match self.execution_mode {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(self.registry.len());
                for estimator in self.registry.iter() {
                    tracing::debug!(estimator = estimator.name(), "running estimator");
                    results.push(f(estimator)?);
                }
                results
            }
            ExecutionMode::Parallel => {
                let mut slots = self
                    .registry
                    .iter()
                    .map(|_| None)
                    .collect::<Vec<Option<Result<T, EstimatorError>>>>();
                let f = &f;
                thread::scope(|s| {
                    for (estimator, slot) in self.registry.iter().zip(&mut slots) {
                        s.spawn(move || {
                            tracing::debug!(estimator = estimator.name(), "running estimator");
                            *slot = Some(f(estimator));
                        });
                    }
                });
                slots
                    .into_iter()
                    .flatten()
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(self
            .registry
            .names()
            .map(str::to_owned)
            .zip(results)
            .collect())
    }

    /// Point estimate of the evaluation policy value for every estimator.
    pub fn estimate_policy_values(
        &self,
        policy: &EvaluationPolicy,
    ) -> Result<PolicyValues, OpeError> {
        let assembled = self.assemble(policy)?;
        let inputs = assembled.estimator_inputs();
        self.run_estimators(|estimator| estimator.estimate_policy_value(&inputs))
    }

    /// Bootstrap confidence interval for every estimator.
    ///
    /// `config` is validated before the input bundle is assembled, so an
    /// invalid level or sample count never reaches an estimator.
    pub fn estimate_intervals(
        &self,
        policy: &EvaluationPolicy,
        config: &BootstrapConfig,
    ) -> Result<PolicyValueIntervals, OpeError> {
        config.validate().map_err(InvalidArgumentError::from)?;
        let assembled = self.assemble(policy)?;
        self.intervals_from(&assembled, config)
    }

    fn intervals_from(
        &self,
        assembled: &AssembledInputs<'_>,
        config: &BootstrapConfig,
    ) -> Result<PolicyValueIntervals, OpeError> {
        let inputs = assembled.estimator_inputs();
        let intervals =
            self.run_estimators(|estimator| estimator.estimate_interval(&inputs, config))?;
        Ok(PolicyValueIntervals {
            alpha: config.alpha,
            intervals,
        })
    }

    /// Point estimates with their ratio to the behavior policy value, and
    /// bootstrap intervals, from a single input bundle.
    ///
    /// When the behavior policy value is not positive the relative column is
    /// `NaN` and the warning sink receives one warning.
    pub fn summarize_off_policy_estimates(
        &self,
        policy: &EvaluationPolicy,
        config: &BootstrapConfig,
    ) -> Result<(PolicyValueSummary, PolicyValueIntervals), OpeError> {
        config.validate().map_err(InvalidArgumentError::from)?;
        let assembled = self.assemble(policy)?;
        let inputs = assembled.estimator_inputs();
        let values = self.run_estimators(|estimator| estimator.estimate_policy_value(&inputs))?;
        let intervals = self.intervals_from(&assembled, config)?;
        let summary = relative_policy_values(
            &values,
            self.behavior_policy_value(),
            self.warning_sink.as_ref(),
        );
        Ok((summary, intervals))
    }

    /// Accuracy of every estimator against `ground_truth_policy_value`.
    pub fn evaluate_performance_of_estimators(
        &self,
        ground_truth_policy_value: f64,
        policy: &EvaluationPolicy,
        metric: Metric,
    ) -> Result<PolicyValues, OpeError> {
        metric.validate_ground_truth(ground_truth_policy_value)?;
        let values = self.estimate_policy_values(policy)?;
        Ok(values.map(|&estimated| metric.evaluate(estimated, ground_truth_policy_value)))
    }

    /// [`Self::evaluate_performance_of_estimators`] as a table labeled with
    /// its metric.
    pub fn summarize_estimators_comparison(
        &self,
        ground_truth_policy_value: f64,
        policy: &EvaluationPolicy,
        metric: Metric,
    ) -> Result<EstimatorComparison, OpeError> {
        let values =
            self.evaluate_performance_of_estimators(ground_truth_policy_value, policy, metric)?;
        Ok(EstimatorComparison { metric, values })
    }
}
