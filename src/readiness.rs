//! Return-to-play classification
//!
//! Tallies the qualitative states of all comparisons and applies a fixed
//! decision order: any at-risk reading blocks play, a majority of cautionary
//! readings advises caution, and everything else clears the athlete.

use serde::{Deserialize, Serialize};

use crate::models::{InsightBundle, QualitativeState, ReadinessStatus, ReturnToPlay};

/// Counts of comparisons per readiness bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTally {
    pub ready: usize,
    pub caution: usize,
    pub at_risk: usize,
}

impl StateTally {
    pub fn from_bundle(bundle: &InsightBundle) -> Self {
        let mut tally = StateTally::default();
        for comparison in &bundle.comparisons {
            match comparison.qualitative_state {
                QualitativeState::Good | QualitativeState::Optimal => tally.ready += 1,
                QualitativeState::Caution | QualitativeState::Warning => tally.caution += 1,
                QualitativeState::AtRisk | QualitativeState::Poor => tally.at_risk += 1,
                _ => {}
            }
        }
        tally
    }
}

/// Derives a `ReturnToPlay` recommendation from a bundle
#[derive(Debug, Clone, Default)]
pub struct ReadinessClassifier;

impl ReadinessClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, bundle: &InsightBundle) -> ReturnToPlay {
        if bundle.comparisons.is_empty() {
            return ReturnToPlay {
                status: ReadinessStatus::Caution,
                message: "Insufficient data to assess readiness".to_string(),
                details: "Sync a wearable device to receive a return-to-play recommendation"
                    .to_string(),
            };
        }

        let tally = StateTally::from_bundle(bundle);

        if tally.at_risk > 0 {
            ReturnToPlay {
                status: ReadinessStatus::NotReady,
                message: "Not ready to return to play".to_string(),
                details: "One or more health metrics are at risk. Rest and consult medical staff before resuming training"
                    .to_string(),
            }
        } else if tally.caution > tally.ready {
            ReturnToPlay {
                status: ReadinessStatus::Caution,
                message: "Return with caution".to_string(),
                details: "Several metrics need attention. Expect full readiness in 3-5 days with reduced load"
                    .to_string(),
            }
        } else {
            ReturnToPlay {
                status: ReadinessStatus::Ready,
                message: "Ready to return to play".to_string(),
                details: "Health metrics are within normal ranges".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comparison;

    fn bundle(states: &[&str]) -> InsightBundle {
        InsightBundle {
            trends: vec![],
            comparisons: states
                .iter()
                .map(|s| Comparison {
                    name: "Metric".to_string(),
                    value: "1".to_string(),
                    qualitative_state: (*s).into(),
                    ..Comparison::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_bundle_is_insufficient_data() {
        let result = ReadinessClassifier::new().classify(&InsightBundle::default());
        assert_eq!(result.status, ReadinessStatus::Caution);
        assert!(result.message.contains("Insufficient data"));
    }

    #[test]
    fn test_any_at_risk_blocks_play() {
        let result = ReadinessClassifier::new().classify(&bundle(&["good", "good", "optimal", "poor"]));
        assert_eq!(result.status, ReadinessStatus::NotReady);
    }

    #[test]
    fn test_caution_majority() {
        let result = ReadinessClassifier::new().classify(&bundle(&["good", "caution", "warning"]));
        assert_eq!(result.status, ReadinessStatus::Caution);
        assert!(result.details.contains("3-5 days"));
        assert!(!result.message.contains("Insufficient"));
    }

    #[test]
    fn test_tie_is_ready() {
        let result = ReadinessClassifier::new().classify(&bundle(&["good", "caution"]));
        assert_eq!(result.status, ReadinessStatus::Ready);
    }

    #[test]
    fn test_untallied_states_alone_are_ready() {
        // normal, critical and unknown labels fall in no bucket
        let result = ReadinessClassifier::new().classify(&bundle(&["normal", "critical", "odd"]));
        assert_eq!(result.status, ReadinessStatus::Ready);
        assert_eq!(
            StateTally::from_bundle(&bundle(&["normal", "critical", "odd"])),
            StateTally::default()
        );
    }
}
