//! Name-keyed estimator registry.
//!
//! Estimators are looked up and reported by [`SlateOffPolicyEstimator::name`].
//! Two registration policies are supported:
//!
//! - [`RegistrationMode::LastWriteWins`] (default): a later estimator with an
//!   already registered name replaces the earlier one. The replacement keeps
//!   the slot of the first registration, so output order stays stable.
//! - [`RegistrationMode::Strict`]: duplicate names are a configuration error.
//!
//! Silent replacement is easy to trip over when two estimators share a
//! default name (for example two `sips` instances with different settings);
//! give them distinct names or use strict mode.

use serde::{Deserialize, Serialize};
use slate_ope_estimator::{BoxedSlateEstimator, SlateOffPolicyEstimator};

use crate::error::ConfigurationError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationMode {
    #[default]
    LastWriteWins,
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct EstimatorRegistry {
    estimators: Vec<BoxedSlateEstimator>,
}

impl EstimatorRegistry {
    pub fn new<I>(estimators: I, mode: RegistrationMode) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = BoxedSlateEstimator>,
    {
        let mut registry = Self::default();
        for estimator in estimators {
            registry.register(estimator, mode)?;
        }
        Ok(registry)
    }

    /// Adds `estimator`, applying `mode` on a name collision.
    pub fn register(
        &mut self,
        estimator: BoxedSlateEstimator,
        mode: RegistrationMode,
    ) -> Result<(), ConfigurationError> {
        let existing = self
            .estimators
            .iter_mut()
            .find(|e| e.name() == estimator.name());
        match (existing, mode) {
            (None, _) => self.estimators.push(estimator),
            (Some(_), RegistrationMode::Strict) => {
                return Err(ConfigurationError::DuplicateEstimator {
                    name: estimator.name().to_owned(),
                });
            }
            (Some(slot), RegistrationMode::LastWriteWins) => {
                tracing::debug!(name = estimator.name(), "replacing estimator with duplicate name");
                *slot = estimator;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn SlateOffPolicyEstimator> {
        self.estimators
            .iter()
            .find(|e| e.name() == name)
            .map(|e| e.as_ref())
    }

    /// Estimators in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SlateOffPolicyEstimator> + '_ {
        self.estimators.iter().map(|e| e.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.estimators.iter().map(|e| e.name())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use slate_ope_estimator::ips::{SlateInverseProbabilityWeighting, WeightingScheme};

    use super::*;

    fn boxed(estimator: SlateInverseProbabilityWeighting) -> BoxedSlateEstimator {
        Box::new(estimator)
    }

    #[test]
    fn test_last_write_wins() {
        let registry = EstimatorRegistry::new(
            [
                boxed(SlateInverseProbabilityWeighting::standard().with_name("ips")),
                boxed(SlateInverseProbabilityWeighting::independent_item()),
                boxed(SlateInverseProbabilityWeighting::reward_interaction().with_name("ips")),
            ],
            RegistrationMode::LastWriteWins,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["ips", "iips"]);
        let kept = format!("{:?}", registry.get("ips").unwrap());
        assert!(kept.contains("RewardInteraction"), "{kept}");
    }

    #[test]
    fn test_strict_rejects_duplicates() {
        let err = EstimatorRegistry::new(
            [
                boxed(SlateInverseProbabilityWeighting::standard()),
                boxed(SlateInverseProbabilityWeighting::new(WeightingScheme::Standard, false)),
            ],
            RegistrationMode::Strict,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateEstimator {
                name: "sips".to_owned()
            }
        );
    }

    #[test]
    fn test_registration_mode_serde() {
        let mode: RegistrationMode = serde_json::from_str("\"strict\"").unwrap();
        assert!(mode.is_strict());
    }
}
