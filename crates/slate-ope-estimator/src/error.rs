use slate_ope_stats::bootstrap::BootstrapError;

/// Failure raised by an estimator or a regression model while scoring.
///
/// The orchestration layer never recovers from these; they surface to the
/// caller unchanged.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EstimatorError {
    #[display("{estimator} requires '{input}', but it is not given")]
    MissingInput {
        estimator: String,
        input: &'static str,
    },
    #[display("'{input}' has {actual} elements, but {expected} are expected")]
    LengthMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },
    #[display("'{input}' must contain only positive values")]
    NonPositivePscore { input: &'static str },
    #[display("estimator inputs contain no rounds")]
    EmptyInput,
    #[display("action {action} is out of range for {n_unique_action} unique actions")]
    InvalidAction {
        action: usize,
        n_unique_action: usize,
    },
    #[display("regression normal equations are singular")]
    SingularSystem,
    #[display("bootstrap failed: {_0}")]
    #[from]
    Bootstrap(BootstrapError),
}
