use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use slate_ope::{
    EvaluationPolicy, ExecutionMode, InvalidArgumentError, LoggedFeedback, Metric, OpeError,
    RegistrationMode, SlateOffPolicyEvaluation, WarningSink,
};
use slate_ope_estimator::{
    BootstrapConfig, BoxedSlateEstimator, ConfidenceInterval, EstimatorError, EstimatorInputs,
    SlateOffPolicyEstimator,
    cascade_dr::SlateCascadeDoublyRobust,
    ips::SlateInverseProbabilityWeighting,
    regression::{FittingMethod, RidgeRegression, SlateRegressionModel},
};
use slate_ope_stats::bootstrap::BootstrapError;

/// Returns a fixed value and counts how often it was asked.
#[derive(Debug, Clone)]
struct SpyEstimator {
    name: String,
    value: f64,
    calls: Arc<AtomicUsize>,
}

impl SpyEstimator {
    fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_owned(),
            value,
            calls: Arc::default(),
        }
    }
}

impl SlateOffPolicyEstimator for SpyEstimator {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_boxed(&self) -> BoxedSlateEstimator {
        Box::new(self.clone())
    }

    fn estimate_policy_value(&self, _inputs: &EstimatorInputs<'_>) -> Result<f64, EstimatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value)
    }

    fn estimate_interval(
        &self,
        _inputs: &EstimatorInputs<'_>,
        _config: &BootstrapConfig,
    ) -> Result<ConfidenceInterval, EstimatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConfidenceInterval {
            mean: self.value,
            lower_bound: self.value,
            upper_bound: self.value,
        })
    }
}

#[derive(Debug, Default)]
struct RecordingSink(Mutex<Vec<String>>);

impl WarningSink for RecordingSink {
    fn warn(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_owned());
    }
}

/// `n_rounds` slates of `len_list` positions over `n_actions` actions with
/// deterministic, varied rewards and a uniform behavior policy.
fn logged_feedback(n_rounds: usize, len_list: usize, n_actions: usize) -> LoggedFeedback {
    let n_rows = n_rounds * len_list;
    #[expect(clippy::cast_precision_loss)]
    let uniform = 1.0 / n_actions as f64;
    let cascade = (0..n_rows)
        .map(|row| {
            let exponent = i32::try_from(row % len_list + 1).unwrap();
            uniform.powi(exponent)
        })
        .collect::<Vec<_>>();
    LoggedFeedback {
        n_unique_action: Some(n_actions),
        slate_id: Some((0..n_rows).map(|row| row / len_list).collect()),
        position: Some((0..n_rows).map(|row| row % len_list).collect()),
        action: Some((0..n_rows).map(|row| (row * 7 + row / len_list) % n_actions).collect()),
        reward: Some(
            (0..n_rows)
                .map(|row| if (row * 5 + 3) % 4 == 0 { 1.0 } else { 0.0 })
                .collect(),
        ),
        context: Some(
            (0..n_rounds)
                .map(|round| {
                    #[expect(clippy::cast_precision_loss)]
                    let x = (round % 3) as f64;
                    vec![x, 1.0 - x]
                })
                .collect(),
        ),
        pscore: Some(vec![uniform.powi(i32::try_from(len_list).unwrap()); n_rows]),
        pscore_item_position: Some(vec![uniform; n_rows]),
        pscore_cascade: Some(cascade),
        ..LoggedFeedback::default()
    }
}

/// Evaluation policy that doubles the probability of the logged slates.
fn evaluation_policy(feedback: &LoggedFeedback, n_actions: usize) -> EvaluationPolicy {
    let double = |values: &Option<Vec<f64>>| {
        values
            .as_ref()
            .map(|v| v.iter().map(|p| (p * 2.0).min(1.0)).collect::<Vec<_>>())
    };
    let n_rows = feedback.reward.as_ref().unwrap().len();
    #[expect(clippy::cast_precision_loss)]
    let uniform = 1.0 / n_actions as f64;
    EvaluationPolicy {
        pscore: double(&feedback.pscore),
        pscore_item_position: double(&feedback.pscore_item_position),
        pscore_cascade: double(&feedback.pscore_cascade),
        action_dist: Some(vec![uniform; n_rows * n_actions]),
    }
}

fn reward_one_feedback() -> LoggedFeedback {
    LoggedFeedback {
        slate_id: Some(vec![0, 0, 1, 1, 2, 2, 3, 3]),
        position: Some(vec![0, 1, 0, 1, 0, 1, 0, 1]),
        reward: Some(vec![1.0; 8]),
        ..LoggedFeedback::default()
    }
}

fn pscore_policy(n_rows: usize) -> EvaluationPolicy {
    EvaluationPolicy {
        pscore: Some(vec![0.5; n_rows]),
        ..EvaluationPolicy::default()
    }
}

fn ips_estimators() -> Vec<BoxedSlateEstimator> {
    vec![
        Box::new(SlateInverseProbabilityWeighting::standard()),
        Box::new(SlateInverseProbabilityWeighting::independent_item()),
        Box::new(SlateInverseProbabilityWeighting::reward_interaction()),
    ]
}

#[test]
fn test_behavior_value_and_relative_estimate() {
    let feedback = reward_one_feedback();
    let spy: BoxedSlateEstimator = Box::new(SpyEstimator::new("spy", 1.0));
    let ope = SlateOffPolicyEvaluation::new(&feedback, [spy]).unwrap();
    assert_eq!(ope.summary().len_list, 2);
    assert_eq!(ope.summary().n_rounds, 4);
    assert!((ope.behavior_policy_value() - 2.0).abs() < 1e-12);

    let (summary, intervals) = ope
        .summarize_off_policy_estimates(&pscore_policy(8), &BootstrapConfig::default())
        .unwrap();
    let row = summary.get("spy").unwrap();
    assert!((row.estimated_policy_value - 1.0).abs() < 1e-12);
    assert!((row.relative_estimated_policy_value - 0.5).abs() < 1e-12);
    assert!((intervals.alpha - 0.05).abs() < f64::EPSILON);
    assert!(intervals.intervals.get("spy").is_some());
}

#[test]
fn test_invalid_bootstrap_config_never_reaches_estimators() {
    let feedback = reward_one_feedback();
    let spy = SpyEstimator::new("spy", 1.0);
    let calls = Arc::clone(&spy.calls);
    let ope = SlateOffPolicyEvaluation::new(&feedback, [Box::new(spy) as BoxedSlateEstimator])
        .unwrap();
    let policy = pscore_policy(8);

    for alpha in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
        let config = BootstrapConfig {
            alpha,
            ..BootstrapConfig::default()
        };
        let err = ope.estimate_intervals(&policy, &config).unwrap_err();
        assert!(matches!(
            err,
            OpeError::InvalidArgument(InvalidArgumentError::InvalidAlpha { .. })
        ));
        let err = ope
            .summarize_off_policy_estimates(&policy, &config)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
    let config = BootstrapConfig {
        n_bootstrap_samples: 0,
        ..BootstrapConfig::default()
    };
    assert_eq!(
        ope.estimate_intervals(&policy, &config),
        Err(OpeError::InvalidArgument(
            InvalidArgumentError::InvalidBootstrapSamples
        ))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_missing_evaluation_pscore() {
    let feedback = reward_one_feedback();
    let ope = SlateOffPolicyEvaluation::new(&feedback, ips_estimators()).unwrap();
    let policy = EvaluationPolicy {
        action_dist: Some(vec![]),
        ..EvaluationPolicy::default()
    };
    assert_eq!(
        ope.estimate_policy_values(&policy),
        Err(OpeError::InvalidArgument(
            InvalidArgumentError::MissingEvaluationPscore
        ))
    );
}

#[test]
fn test_duplicate_names() {
    let feedback = reward_one_feedback();
    let estimators: Vec<BoxedSlateEstimator> = vec![
        Box::new(SpyEstimator::new("same", 1.0)),
        Box::new(SpyEstimator::new("other", 3.0)),
        Box::new(SpyEstimator::new("same", 2.0)),
    ];

    let ope = SlateOffPolicyEvaluation::new(&feedback, estimators.clone()).unwrap();
    let values = ope.estimate_policy_values(&pscore_policy(8)).unwrap();
    assert_eq!(values.names().collect::<Vec<_>>(), ["same", "other"]);
    assert!((values.get("same").unwrap() - 2.0).abs() < 1e-12);

    let err = SlateOffPolicyEvaluation::builder(&feedback)
        .estimators(estimators)
        .registration_mode(RegistrationMode::Strict)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("same"), "{err}");
}

#[test]
fn test_summary_point_column_matches_point_estimates() {
    let feedback = logged_feedback(40, 3, 4);
    let policy = evaluation_policy(&feedback, 4);
    let ope = SlateOffPolicyEvaluation::new(&feedback, ips_estimators()).unwrap();

    let values = ope.estimate_policy_values(&policy).unwrap();
    let config = BootstrapConfig {
        random_state: Some(1),
        n_bootstrap_samples: 20,
        ..BootstrapConfig::default()
    };
    let (summary, _) = ope.summarize_off_policy_estimates(&policy, &config).unwrap();
    for ((name, value), (summary_name, row)) in values.iter().zip(summary.iter()) {
        assert_eq!(name, summary_name);
        assert!((value - row.estimated_policy_value).abs() < f64::EPSILON);
    }
}

#[test]
fn test_non_positive_behavior_value_is_nan_with_warning() {
    let mut feedback = reward_one_feedback();
    feedback.reward = Some(vec![0.0; 8]);
    feedback.pscore = Some(vec![0.25; 8]);
    let sink = Arc::new(RecordingSink::default());
    let ope = SlateOffPolicyEvaluation::builder(&feedback)
        .estimator(Box::new(SlateInverseProbabilityWeighting::standard()))
        .warning_sink(sink.clone())
        .build()
        .unwrap();

    let (summary, _) = ope
        .summarize_off_policy_estimates(&pscore_policy(8), &BootstrapConfig::default())
        .unwrap();
    let row = summary.get("sips").unwrap();
    assert!(row.estimated_policy_value.abs() < 1e-12);
    assert!(row.relative_estimated_policy_value.is_nan());
    assert_eq!(sink.0.lock().unwrap().len(), 1);
}

#[test]
fn test_ground_truth_metrics() {
    let feedback = reward_one_feedback();
    let spy: BoxedSlateEstimator = Box::new(SpyEstimator::new("spy", 1.5));
    let ope = SlateOffPolicyEvaluation::new(&feedback, [spy]).unwrap();
    let policy = pscore_policy(8);

    assert_eq!(
        ope.evaluate_performance_of_estimators(0.0, &policy, Metric::RelativeEe),
        Err(OpeError::InvalidArgument(InvalidArgumentError::ZeroGroundTruth))
    );
    let se = ope
        .evaluate_performance_of_estimators(0.0, &policy, Metric::Se)
        .unwrap();
    assert!((se.get("spy").unwrap() - 2.25).abs() < 1e-12);

    let comparison = ope
        .summarize_estimators_comparison(2.0, &policy, "relative-ee".parse().unwrap())
        .unwrap();
    assert_eq!(comparison.metric, Metric::RelativeEe);
    assert!((comparison.values.get("spy").unwrap() - 0.25).abs() < 1e-12);

    let err = ope
        .evaluate_performance_of_estimators(f64::NAN, &policy, Metric::Se)
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_interval_seeds() {
    let feedback = logged_feedback(60, 3, 4);
    let policy = evaluation_policy(&feedback, 4);
    let ope = SlateOffPolicyEvaluation::new(&feedback, ips_estimators()).unwrap();
    let config = |seed| BootstrapConfig {
        random_state: Some(seed),
        n_bootstrap_samples: 50,
        ..BootstrapConfig::default()
    };

    let a = ope.estimate_intervals(&policy, &config(12345)).unwrap();
    let b = ope.estimate_intervals(&policy, &config(12345)).unwrap();
    let c = ope.estimate_intervals(&policy, &config(54321)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    for (_, interval) in a.intervals.iter() {
        assert!(interval.lower_bound <= interval.mean);
        assert!(interval.mean <= interval.upper_bound);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let feedback = logged_feedback(50, 2, 3);
    let policy = evaluation_policy(&feedback, 3);
    let estimators = ips_estimators();
    let sequential = SlateOffPolicyEvaluation::new(&feedback, estimators.clone()).unwrap();
    let parallel = SlateOffPolicyEvaluation::builder(&feedback)
        .estimators(estimators)
        .execution_mode(ExecutionMode::Parallel)
        .build()
        .unwrap();

    assert_eq!(
        sequential.estimate_policy_values(&policy).unwrap(),
        parallel.estimate_policy_values(&policy).unwrap()
    );
    let config = BootstrapConfig {
        random_state: Some(7),
        n_bootstrap_samples: 40,
        ..BootstrapConfig::default()
    };
    let parallel_bootstrap = BootstrapConfig {
        parallel: true,
        ..config
    };
    assert_eq!(
        sequential.estimate_intervals(&policy, &config).unwrap(),
        parallel
            .estimate_intervals(&policy, &parallel_bootstrap)
            .unwrap()
    );
}

#[test]
fn test_parallel_reports_first_error_in_registry_order() {
    let feedback = reward_one_feedback();
    let estimators: Vec<BoxedSlateEstimator> = vec![
        Box::new(SpyEstimator::new("spy", 1.0)),
        Box::new(SlateInverseProbabilityWeighting::independent_item()),
        Box::new(SlateInverseProbabilityWeighting::standard()),
    ];
    let ope = SlateOffPolicyEvaluation::builder(&feedback)
        .estimators(estimators)
        .execution_mode(ExecutionMode::Parallel)
        .build()
        .unwrap();
    let err = ope.estimate_policy_values(&pscore_policy(8)).unwrap_err();
    assert_eq!(
        err,
        OpeError::Estimator(EstimatorError::MissingInput {
            estimator: "iips".to_owned(),
            input: "pscore_item_position",
        })
    );
}

#[test]
fn test_cascade_dr_with_regression_model() {
    let n_actions = 3;
    let feedback = logged_feedback(80, 2, n_actions);
    let policy = evaluation_policy(&feedback, n_actions);
    let model = SlateRegressionModel::new(RidgeRegression::default(), FittingMethod::Normal);
    let ope = SlateOffPolicyEvaluation::builder(&feedback)
        .estimators(ips_estimators())
        .estimator(Box::new(SlateCascadeDoublyRobust::new()))
        .with_regression_model(Arc::new(model))
        .build()
        .unwrap();

    let values = ope.estimate_policy_values(&policy).unwrap();
    assert_eq!(
        values.names().collect::<Vec<_>>(),
        ["sips", "iips", "rips", "cascade-dr"]
    );
    assert!(values.get("cascade-dr").unwrap().is_finite());

    let without_model = SlateOffPolicyEvaluation::new(
        &feedback,
        [Box::new(SlateCascadeDoublyRobust::new()) as BoxedSlateEstimator],
    )
    .unwrap();
    let err = without_model.estimate_policy_values(&policy).unwrap_err();
    assert_eq!(
        err,
        OpeError::Estimator(EstimatorError::MissingInput {
            estimator: "cascade-dr".to_owned(),
            input: "q_hat_for_counterfactual_actions",
        })
    );
}

#[test]
fn test_non_finite_evaluation_pscore_is_rejected() {
    let feedback = logged_feedback(20, 2, 3);
    let spy = SpyEstimator::new("spy", 1.0);
    let calls = Arc::clone(&spy.calls);
    let mut estimators = ips_estimators();
    estimators.push(Box::new(spy));
    let ope = SlateOffPolicyEvaluation::new(&feedback, estimators).unwrap();
    let mut policy = evaluation_policy(&feedback, 3);
    policy.pscore.as_mut().unwrap()[3] = f64::NAN;

    let expected = OpeError::InvalidArgument(InvalidArgumentError::NonFiniteProbability {
        field: "evaluation_policy_pscore",
        index: 3,
    });
    assert_eq!(ope.estimate_policy_values(&policy), Err(expected.clone()));
    assert_eq!(
        ope.estimate_intervals(&policy, &BootstrapConfig::default()),
        Err(expected.clone())
    );
    assert_eq!(
        ope.summarize_off_policy_estimates(&policy, &BootstrapConfig::default())
            .unwrap_err(),
        expected
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_non_finite_reward_interval_is_an_error() {
    let mut feedback = logged_feedback(20, 2, 3);
    feedback.reward.as_mut().unwrap()[5] = f64::NAN;
    let policy = evaluation_policy(&feedback, 3);
    let ope = SlateOffPolicyEvaluation::builder(&feedback)
        .estimator(Box::new(SlateInverseProbabilityWeighting::standard()))
        .build()
        .unwrap();

    for mode in [false, true] {
        let config = BootstrapConfig {
            random_state: Some(7),
            n_bootstrap_samples: 30,
            parallel: mode,
            ..BootstrapConfig::default()
        };
        assert_eq!(
            ope.estimate_intervals(&policy, &config),
            Err(OpeError::Estimator(EstimatorError::Bootstrap(
                BootstrapError::NonFiniteSample
            )))
        );
    }
}
