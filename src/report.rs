use serde::Serialize;

use crate::WeightSet;

/// Weights as they were at the end of an epoch that beat every earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsSnapshot {
    pub epoch: usize,
    pub errors: usize,
    pub weights: WeightSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// Zero mistakes were reached at this 0-based epoch.
    Converged { epoch: usize },
    Exhausted { min_errors: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    epochs_executed: usize,
    epoch_zero_errors: Option<usize>,
    min_errors: usize,
    improved_weights: Vec<WeightsSnapshot>,
}

impl TrainingReport {
    pub(crate) fn new(
        epochs_executed: usize,
        epoch_zero_errors: Option<usize>,
        min_errors: usize,
        improved_weights: Vec<WeightsSnapshot>,
    ) -> Self {
        Self { epochs_executed, epoch_zero_errors, min_errors, improved_weights }
    }

    pub fn epochs_executed(&self) -> usize { self.epochs_executed }
    pub fn epoch_zero_errors(&self) -> Option<usize> { self.epoch_zero_errors }
    pub fn min_errors(&self) -> usize { self.min_errors }
    /// Snapshots in epoch order, with strictly decreasing error counts.
    pub fn improved_weights(&self) -> &[WeightsSnapshot] { &self.improved_weights }

    /// Best weights seen during the run, if any epoch improved.
    pub fn best_weights(&self) -> Option<&WeightSet> {
        self.improved_weights.last().map(|s| &s.weights)
    }

    pub fn outcome(&self) -> TrainingOutcome {
        match self.epoch_zero_errors {
            Some(epoch) => TrainingOutcome::Converged { epoch },
            None => TrainingOutcome::Exhausted { min_errors: self.min_errors },
        }
    }

    pub fn summary(&self) -> TrainingSummary {
        TrainingSummary {
            outcome: self.outcome(),
            epochs_executed: self.epochs_executed,
            improvements: self
                .improved_weights
                .iter()
                .map(|s| Improvement { epoch: s.epoch, errors: s.errors })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Improvement {
    pub epoch: usize,
    pub errors: usize,
}

/// Weight-free view of a report, written by `train --report`. The best
/// error count travels with the `exhausted` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainingSummary {
    #[serde(flatten)]
    pub outcome: TrainingOutcome,
    pub epochs_executed: usize,
    pub improvements: Vec<Improvement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(epoch: usize, errors: usize) -> WeightsSnapshot {
        WeightsSnapshot { epoch, errors, weights: WeightSet::zeroed(1, 1, 1).unwrap() }
    }

    #[test]
    fn outcome_follows_zero_error_epoch() {
        let converged = TrainingReport::new(8, Some(7), 0, vec![snapshot(0, 3), snapshot(7, 0)]);
        assert_eq!(converged.outcome(), TrainingOutcome::Converged { epoch: 7 });

        let exhausted = TrainingReport::new(10, None, 2, vec![snapshot(0, 2)]);
        assert_eq!(exhausted.outcome(), TrainingOutcome::Exhausted { min_errors: 2 });
    }

    #[test]
    fn summary_serializes_flat() {
        let report = TrainingReport::new(8, Some(7), 0, vec![snapshot(0, 3), snapshot(7, 0)]);
        let json: serde_json::Value = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(json["outcome"], "converged");
        assert_eq!(json["epoch"], 7);
        assert_eq!(json["epochs_executed"], 8);
        assert_eq!(json["improvements"][1]["errors"], 0);
        assert!(json.get("min_errors").is_none());

        let report = TrainingReport::new(1, None, 3, vec![snapshot(0, 3)]);
        let text = serde_json::to_string(&report.summary()).unwrap();
        assert_eq!(text.matches("\"min_errors\"").count(), 1, "{}", text);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["outcome"], "exhausted");
        assert_eq!(json["min_errors"], 3);
        assert_eq!(json["epochs_executed"], 1);
        assert!(json.get("epoch").is_none());
    }
}
