use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use slate_ope::{
    EvaluationConfig, EvaluationPolicy, ExecutionMode, LoggedFeedback, Metric, RegistrationMode,
    SlateOffPolicyEvaluation,
};
use slate_ope_estimator::{
    BoxedSlateEstimator,
    cascade_dr::SlateCascadeDoublyRobust,
    ips::{SlateInverseProbabilityWeighting, WeightingScheme},
    regression::{FittingMethod, RidgeRegression, SlateRegressionModel},
};

use crate::util::{self, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EstimatorKind {
    Sips,
    Iips,
    Rips,
    Snsips,
    Sniips,
    Snrips,
    CascadeDr,
}

impl EstimatorKind {
    fn build(self) -> BoxedSlateEstimator {
        let ips = |scheme, self_normalized| -> BoxedSlateEstimator {
            Box::new(SlateInverseProbabilityWeighting::new(scheme, self_normalized))
        };
        match self {
            Self::Sips => ips(WeightingScheme::Standard, false),
            Self::Iips => ips(WeightingScheme::IndependentItem, false),
            Self::Rips => ips(WeightingScheme::RewardInteraction, false),
            Self::Snsips => ips(WeightingScheme::Standard, true),
            Self::Sniips => ips(WeightingScheme::IndependentItem, true),
            Self::Snrips => ips(WeightingScheme::RewardInteraction, true),
            Self::CascadeDr => Box::new(SlateCascadeDoublyRobust::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum FittingMethodArg {
    Normal,
    Iw,
}

impl From<FittingMethodArg> for FittingMethod {
    fn from(arg: FittingMethodArg) -> Self {
        match arg {
            FittingMethodArg::Normal => FittingMethod::Normal,
            FittingMethodArg::Iw => FittingMethod::Iw,
        }
    }
}

/// Inputs shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InputArg {
    /// Logged feedback JSON file
    #[arg(long)]
    pub feedback: PathBuf,
    /// Evaluation-policy probabilities JSON file
    #[arg(long)]
    pub policy: PathBuf,
    /// Estimators to run, in output order
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [EstimatorKind::Sips, EstimatorKind::Iips, EstimatorKind::Rips])]
    pub estimators: Vec<EstimatorKind>,
    /// Fit the slate regression model and pass its output to the estimators
    #[arg(long)]
    pub regression: bool,
    /// Ridge penalty of the per-position regressors
    #[arg(long, default_value_t = 1.0)]
    pub ridge_lambda: f64,
    /// Weighting of the per-position regressions
    #[arg(long, value_enum, default_value_t = FittingMethodArg::Normal)]
    pub fitting_method: FittingMethodArg,
    /// Evaluation config JSON file; command-line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output file path (stdout when absent)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Run estimators and bootstrap resamples on worker threads
    #[arg(long)]
    pub parallel: bool,
    /// Reject duplicate estimator names instead of keeping the last one
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Default, Clone, clap::Args)]
pub(crate) struct BootstrapArg {
    /// Significance level of the confidence intervals
    #[arg(long)]
    pub alpha: Option<f64>,
    /// Number of bootstrap resamples
    #[arg(long)]
    pub n_bootstrap_samples: Option<usize>,
    /// Seed of the bootstrap resampling
    #[arg(long)]
    pub random_state: Option<u64>,
}

impl InputArg {
    /// Loads the config file, if any, and applies command-line overrides.
    pub fn load_config(
        &self,
        bootstrap: &BootstrapArg,
        metric: Option<Metric>,
    ) -> anyhow::Result<EvaluationConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_config_file(path)?,
            None => EvaluationConfig::default(),
        };
        if let Some(alpha) = bootstrap.alpha {
            config.bootstrap.alpha = alpha;
        }
        if let Some(n) = bootstrap.n_bootstrap_samples {
            config.bootstrap.n_bootstrap_samples = n;
        }
        if bootstrap.random_state.is_some() {
            config.bootstrap.random_state = bootstrap.random_state;
        }
        if let Some(metric) = metric {
            config.metric = metric;
        }
        if self.parallel {
            config.execution_mode = ExecutionMode::Parallel;
            config.bootstrap.parallel = true;
        }
        if self.strict {
            config.registration_mode = RegistrationMode::Strict;
        }
        Ok(config)
    }

    pub fn load_data(&self) -> anyhow::Result<(LoggedFeedback, EvaluationPolicy)> {
        let feedback = util::read_feedback_file(&self.feedback)?;
        let policy = util::read_policy_file(&self.policy)?;
        Ok((feedback, policy))
    }

    pub fn build_evaluation<'a>(
        &self,
        feedback: &'a LoggedFeedback,
        config: &EvaluationConfig,
    ) -> anyhow::Result<SlateOffPolicyEvaluation<'a>> {
        let mut builder = SlateOffPolicyEvaluation::builder(feedback)
            .config(config)
            .estimators(self.estimators.iter().map(|kind| kind.build()));
        if self.regression {
            let model = SlateRegressionModel::new(
                RidgeRegression::new(self.ridge_lambda),
                self.fitting_method.into(),
            );
            builder = builder.with_regression_model(Arc::new(model));
        }
        let evaluation = builder
            .build()
            .with_context(|| format!("Invalid logged feedback: {}", self.feedback.display()))?;
        let summary = evaluation.summary();
        tracing::info!(
            n_rounds = summary.n_rounds,
            len_list = summary.len_list,
            n_unique_action = summary.n_unique_action,
            "loaded logged feedback"
        );
        Ok(evaluation)
    }
}

/// Writes `result` inside a timestamped [`Report`].
pub(crate) fn write_report<T>(
    arg: &InputArg,
    feedback: &LoggedFeedback,
    evaluation: &SlateOffPolicyEvaluation<'_>,
    config: EvaluationConfig,
    result: T,
) -> anyhow::Result<()>
where
    T: Serialize,
{
    let report = Report {
        evaluated_at: Utc::now(),
        feedback: evaluation.summary(),
        behavior_policy_value: evaluation.behavior_policy_value(),
        round_reward: feedback.round_reward_stats(),
        config,
        result,
    };
    util::write_json(&report, arg.output.as_deref())
}
