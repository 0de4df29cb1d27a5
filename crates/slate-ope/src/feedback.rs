//! Logged slate feedback and its validation.
//!
//! [`LoggedFeedback`] mirrors a keyed record set: every field is optional so
//! that data loaded from JSON can be missing keys, and the validator can
//! name exactly which required key is absent.
//!
//! # Layout
//!
//! Rows are ordered by slate and, within a slate, by position:
//!
//! ```text
//! row:       0  1  2  3  4  5
//! slate_id:  0  0  0  1  1  1
//! position:  0  1  2  0  1  2
//! ```
//!
//! The slate length `len_list` is read off the data as the number of rows of
//! slate `0`, and every other slate must have the same number of contiguous
//! rows.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use slate_ope_estimator::estimator::aggregate_round_rewards;
use slate_ope_stats::descriptive::DescriptiveStats;

use crate::error::ConfigurationError;

/// Logged interaction data collected under the behavior policy.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggedFeedback {
    pub n_rounds: Option<usize>,
    pub n_unique_action: Option<usize>,
    pub slate_id: Option<Vec<usize>>,
    /// One feature row per round.
    pub context: Option<Vec<Vec<f64>>>,
    /// One feature row per action.
    pub action_context: Option<Vec<Vec<f64>>>,
    pub action: Option<Vec<usize>>,
    pub position: Option<Vec<usize>>,
    pub reward: Option<Vec<f64>>,
    pub pscore: Option<Vec<f64>>,
    pub pscore_item_position: Option<Vec<f64>>,
    pub pscore_cascade: Option<Vec<f64>>,
}

/// Scalars derived from validated feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackSummary {
    /// Number of distinct slates.
    pub n_rounds: usize,
    /// Number of positions per slate.
    pub len_list: usize,
    pub n_unique_action: usize,
    /// `n_rounds * len_list`.
    pub n_rows: usize,
}

fn required<'a, T>(value: Option<&'a Vec<T>>, key: &'static str) -> Result<&'a [T], ConfigurationError> {
    value
        .map(Vec::as_slice)
        .ok_or(ConfigurationError::MissingKey { key })
}

fn check_field_len<T>(
    value: Option<&Vec<T>>,
    field: &'static str,
    expected: usize,
) -> Result<(), ConfigurationError> {
    match value {
        Some(v) if v.len() != expected => Err(ConfigurationError::FieldLength {
            field,
            expected,
            actual: v.len(),
        }),
        _ => Ok(()),
    }
}

impl FeedbackSummary {
    /// Validates `feedback` and derives its summary scalars.
    pub fn from_feedback(feedback: &LoggedFeedback) -> Result<Self, ConfigurationError> {
        let slate_id = required(feedback.slate_id.as_ref(), "slate_id")?;
        let position = required(feedback.position.as_ref(), "position")?;
        let _reward = required(feedback.reward.as_ref(), "reward")?;

        let n_rows = slate_id.len();
        if n_rows == 0 {
            return Err(ConfigurationError::EmptyFeedback);
        }
        check_field_len(feedback.position.as_ref(), "position", n_rows)?;
        check_field_len(feedback.reward.as_ref(), "reward", n_rows)?;

        let len_list = slate_id.iter().filter(|&&id| id == 0).count();
        if len_list == 0 {
            return Err(ConfigurationError::MissingFirstSlate);
        }
        let n_distinct = slate_id.iter().collect::<BTreeSet<_>>().len();
        let n_rounds = feedback.n_rounds.unwrap_or(n_distinct);
        if n_rounds != n_distinct || n_rounds * len_list != n_rows {
            return Err(ConfigurationError::UnevenSlates {
                n_rounds,
                len_list,
                n_rows,
            });
        }
        // with equal-sized groups and n_distinct slates, uniform chunks imply disjoint slates
        for (chunk_idx, chunk) in slate_id.chunks(len_list).enumerate() {
            let start = chunk_idx * len_list;
            if let Some(offset) = chunk.iter().position(|&id| id != chunk[0]) {
                return Err(ConfigurationError::MalformedSlate { row: start + offset });
            }
        }
        if let Some(row) = (0..n_rows).find(|&row| position[row] != row % len_list) {
            return Err(ConfigurationError::MalformedSlate { row });
        }

        check_field_len(feedback.action.as_ref(), "action", n_rows)?;
        check_field_len(feedback.pscore.as_ref(), "pscore", n_rows)?;
        check_field_len(
            feedback.pscore_item_position.as_ref(),
            "pscore_item_position",
            n_rows,
        )?;
        check_field_len(feedback.pscore_cascade.as_ref(), "pscore_cascade", n_rows)?;
        check_field_len(feedback.context.as_ref(), "context", n_rounds)?;

        let max_action = feedback
            .action
            .as_ref()
            .and_then(|actions| actions.iter().max().copied());
        let n_unique_action = match (feedback.n_unique_action, max_action) {
            (Some(n), Some(max)) if max >= n => {
                return Err(ConfigurationError::ActionOutOfRange {
                    action: max,
                    n_unique_action: n,
                });
            }
            (Some(n), _) => n,
            (None, Some(max)) => max + 1,
            (None, None) => 0,
        };
        check_field_len(
            feedback.action_context.as_ref(),
            "action_context",
            n_unique_action,
        )?;

        Ok(Self {
            n_rounds,
            len_list,
            n_unique_action,
            n_rows,
        })
    }
}

impl LoggedFeedback {
    /// `sum(reward) / number_of_distinct_slates`, the on-policy value of the
    /// behavior policy.
    ///
    /// Returns `NaN` when rewards or slates are missing.
    #[must_use]
    pub fn behavior_policy_value(&self) -> f64 {
        let (Some(reward), Some(slate_id)) = (&self.reward, &self.slate_id) else {
            return f64::NAN;
        };
        let n_slates = slate_id.iter().collect::<BTreeSet<_>>().len();
        if n_slates == 0 {
            return f64::NAN;
        }
        #[expect(clippy::cast_precision_loss)]
        let n_slates = n_slates as f64;
        reward.iter().sum::<f64>() / n_slates
    }

    /// Descriptive statistics of the per-slate reward sums.
    #[must_use]
    pub fn round_reward_stats(&self) -> Option<DescriptiveStats> {
        let (reward, slate_id) = (self.reward.as_ref()?, self.slate_id.as_ref()?);
        DescriptiveStats::new(aggregate_round_rewards(slate_id, reward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feedback(n_rounds: usize, len_list: usize) -> LoggedFeedback {
        let n_rows = n_rounds * len_list;
        LoggedFeedback {
            slate_id: Some((0..n_rows).map(|row| row / len_list).collect()),
            position: Some((0..n_rows).map(|row| row % len_list).collect()),
            reward: Some(vec![1.0; n_rows]),
            ..LoggedFeedback::default()
        }
    }

    #[test]
    fn test_derives_len_list_and_rounds() {
        let summary = FeedbackSummary::from_feedback(&feedback(4, 2)).unwrap();
        assert_eq!(summary.len_list, 2);
        assert_eq!(summary.n_rounds, 4);
        assert_eq!(summary.n_rounds * summary.len_list, summary.n_rows);
        assert_eq!(summary.n_unique_action, 0);
    }

    #[test]
    fn test_missing_required_keys() {
        for key in ["slate_id", "position", "reward"] {
            let mut fb = feedback(2, 2);
            match key {
                "slate_id" => fb.slate_id = None,
                "position" => fb.position = None,
                _ => fb.reward = None,
            }
            assert_eq!(
                FeedbackSummary::from_feedback(&fb),
                Err(ConfigurationError::MissingKey { key })
            );
        }
    }

    #[test]
    fn test_empty_feedback() {
        assert_eq!(
            FeedbackSummary::from_feedback(&feedback(0, 3)),
            Err(ConfigurationError::EmptyFeedback)
        );
    }

    #[test]
    fn test_uneven_slates() {
        let mut fb = feedback(2, 2);
        fb.slate_id = Some(vec![0, 0, 1]);
        fb.position = Some(vec![0, 1, 0]);
        fb.reward = Some(vec![1.0; 3]);
        assert!(matches!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::UnevenSlates { .. })
        ));
    }

    #[test]
    fn test_interleaved_slates() {
        let mut fb = feedback(2, 2);
        fb.slate_id = Some(vec![0, 1, 0, 1]);
        assert_eq!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::MalformedSlate { row: 1 })
        );
    }

    #[test]
    fn test_explicit_n_rounds_mismatch() {
        let mut fb = feedback(3, 2);
        fb.n_rounds = Some(4);
        assert!(matches!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::UnevenSlates { n_rounds: 4, .. })
        ));
    }

    #[test]
    fn test_optional_field_length() {
        let mut fb = feedback(2, 2);
        fb.pscore = Some(vec![0.5; 3]);
        assert_eq!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::FieldLength {
                field: "pscore",
                expected: 4,
                actual: 3,
            })
        );
    }

    #[test]
    fn test_n_unique_action_derivation() {
        let mut fb = feedback(2, 2);
        fb.action = Some(vec![0, 4, 2, 1]);
        assert_eq!(FeedbackSummary::from_feedback(&fb).unwrap().n_unique_action, 5);

        fb.n_unique_action = Some(7);
        assert_eq!(FeedbackSummary::from_feedback(&fb).unwrap().n_unique_action, 7);

        fb.n_unique_action = Some(3);
        assert_eq!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::ActionOutOfRange {
                action: 4,
                n_unique_action: 3,
            })
        );
    }

    #[test]
    fn test_behavior_policy_value() {
        assert!((feedback(4, 2).behavior_policy_value() - 2.0).abs() < 1e-12);
        assert!(LoggedFeedback::default().behavior_policy_value().is_nan());
    }

    #[test]
    fn test_round_reward_stats() {
        let mut fb = feedback(3, 2);
        fb.reward = Some(vec![1.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let stats = fb.round_reward_stats().unwrap();
        assert!((stats.min - 0.0).abs() < 1e-12);
        assert!((stats.max - 2.0).abs() < 1e-12);
        assert!((stats.mean - fb.behavior_policy_value()).abs() < 1e-12);
        assert!(LoggedFeedback::default().round_reward_stats().is_none());
    }

    #[test]
    fn test_deserialize_missing_key() {
        let fb: LoggedFeedback =
            serde_json::from_str(r#"{"slate_id": [0, 0], "reward": [1.0, 0.0]}"#).unwrap();
        assert_eq!(
            FeedbackSummary::from_feedback(&fb),
            Err(ConfigurationError::MissingKey { key: "position" })
        );
    }
}
