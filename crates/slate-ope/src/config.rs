use serde::{Deserialize, Serialize};
use slate_ope_estimator::BootstrapConfig;

use crate::{registry::RegistrationMode, summary::Metric};

/// How the per-estimator loop is executed.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// One scoped thread per estimator.
    Parallel,
}

/// File-loadable evaluation settings.
///
/// Bootstrap keys sit at the top level:
///
/// ```json
/// { "alpha": 0.1, "n_bootstrap_samples": 200, "random_state": 7, "metric": "se" }
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    #[serde(flatten)]
    pub bootstrap: BootstrapConfig,
    pub metric: Metric,
    pub is_factorizable: bool,
    pub execution_mode: ExecutionMode,
    pub registration_mode: RegistrationMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: EvaluationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EvaluationConfig::default());
        assert!((config.bootstrap.alpha - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.bootstrap.n_bootstrap_samples, 100);
        assert!(config.execution_mode.is_sequential());
    }

    #[test]
    fn test_flattened_bootstrap_keys() {
        let config: EvaluationConfig = serde_json::from_str(
            r#"{
                "alpha": 0.1,
                "n_bootstrap_samples": 20,
                "random_state": 7,
                "metric": "se",
                "execution_mode": "parallel",
                "registration_mode": "strict"
            }"#,
        )
        .unwrap();
        assert!((config.bootstrap.alpha - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.bootstrap.n_bootstrap_samples, 20);
        assert_eq!(config.bootstrap.random_state, Some(7));
        assert_eq!(config.metric, Metric::Se);
        assert!(config.execution_mode.is_parallel());
        assert!(config.registration_mode.is_strict());
    }
}
