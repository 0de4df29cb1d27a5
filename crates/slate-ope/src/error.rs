use slate_ope_estimator::EstimatorError;
use slate_ope_stats::bootstrap::BootstrapError;

/// Malformed logged feedback or ambiguous estimator registration.
///
/// Raised while constructing an evaluation; never retried.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConfigurationError {
    #[display("Missing key of {key} in logged feedback")]
    MissingKey { key: &'static str },
    #[display("estimator name '{name}' is registered more than once")]
    DuplicateEstimator { name: String },
    #[display("logged feedback contains no rows")]
    EmptyFeedback,
    #[display("logged feedback has no slate with id 0, so the slate length cannot be derived")]
    MissingFirstSlate,
    #[display(
        "{n_rows} rows cannot be split into {n_rounds} slates of length {len_list}"
    )]
    UnevenSlates {
        n_rounds: usize,
        len_list: usize,
        n_rows: usize,
    },
    #[display("row {row} breaks the contiguous slate layout (slate id or position out of order)")]
    MalformedSlate { row: usize },
    #[display("'{field}' has {actual} elements, but {expected} are expected")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("action {action} is out of range for {n_unique_action} unique actions")]
    ActionOutOfRange {
        action: usize,
        n_unique_action: usize,
    },
}

/// Caller-supplied arguments that make an evaluation call meaningless.
///
/// Raised before any estimator or regression model runs.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum InvalidArgumentError {
    #[display(
        "one of evaluation_policy_pscore, evaluation_policy_pscore_item_position, or evaluation_policy_pscore_cascade must be given"
    )]
    MissingEvaluationPscore,
    #[display("alpha must be in the open interval (0, 1), but {alpha} is given")]
    InvalidAlpha { alpha: f64 },
    #[display("n_bootstrap_samples must be a positive integer")]
    InvalidBootstrapSamples,
    #[display("metric must be either 'relative-ee' or 'se', but {metric} is given")]
    UnknownMetric { metric: String },
    #[display("ground_truth_policy_value must be non-zero when metric is relative-ee")]
    ZeroGroundTruth,
    #[display("ground_truth_policy_value must be finite, but {value} is given")]
    NonFiniteGroundTruth { value: f64 },
    #[display("'{field}' has {actual} elements, but {expected} are expected")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("'{field}' contains a non-finite value at index {index}")]
    NonFiniteProbability { field: &'static str, index: usize },
}

impl From<BootstrapError> for InvalidArgumentError {
    fn from(err: BootstrapError) -> Self {
        match err {
            BootstrapError::InvalidAlpha { alpha } => Self::InvalidAlpha { alpha },
            BootstrapError::InvalidSampleCount
            | BootstrapError::EmptySample
            | BootstrapError::NonFiniteSample => Self::InvalidBootstrapSamples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From, derive_more::IsVariant)]
pub enum OpeError {
    #[display("configuration error: {_0}")]
    Configuration(ConfigurationError),
    #[display("invalid argument: {_0}")]
    InvalidArgument(InvalidArgumentError),
    #[display("estimator computation failed: {_0}")]
    Estimator(EstimatorError),
}
