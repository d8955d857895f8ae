//! Alert generation
//!
//! Comparisons flagged `at_risk` raise a warning and those flagged `warning`
//! raise an informational alert. Other states, including `poor` and
//! `critical`, are left to the readiness classifier.

use crate::classify::{self, MetricTopic};
use crate::models::{Alert, AlertType, Comparison, InsightBundle, QualitativeState};

const HEART_RATE_AT_RISK: &str =
    "Consider reducing training intensity and consult a healthcare provider if this persists";
const HEART_RATE_MONITOR: &str = "Monitor heart rate trends closely over the next few days";
const SLEEP_HYGIENE: &str =
    "Focus on sleep hygiene: keep a consistent bedtime, limit screens before bed, and aim for 7-9 hours";
const ACTIVITY_GRADUAL: &str = "Gradually increase daily activity levels rather than making sudden jumps";
const GENERIC_MONITOR: &str = "Continue monitoring this metric";

/// Turns flagged comparisons into alerts
#[derive(Debug, Clone, Default)]
pub struct AlertGenerator;

impl AlertGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, bundle: &InsightBundle) -> Vec<Alert> {
        bundle
            .comparisons
            .iter()
            .filter_map(|c| alert_type(&c.qualitative_state).map(|t| (c, t)))
            .enumerate()
            .map(|(index, (comparison, alert_type))| Alert {
                id: index as u32 + 1,
                alert_type,
                message: message(comparison, alert_type),
                recommendation: recommendation(comparison).to_string(),
                metric: comparison.name.clone(),
            })
            .collect()
    }
}

fn alert_type(state: &QualitativeState) -> Option<AlertType> {
    match state {
        QualitativeState::AtRisk => Some(AlertType::Warning),
        QualitativeState::Warning => Some(AlertType::Info),
        _ => None,
    }
}

fn message(comparison: &Comparison, alert_type: AlertType) -> String {
    let name = if comparison.name.is_empty() {
        "A tracked metric"
    } else {
        comparison.name.as_str()
    };

    match alert_type {
        AlertType::Warning => format!("{} is at risk ({})", name, comparison.value.trim()),
        AlertType::Info => format!("{} needs attention ({})", name, comparison.value.trim()),
    }
}

fn recommendation(comparison: &Comparison) -> &'static str {
    match classify::metric_topic(&comparison.name) {
        MetricTopic::HeartRate if comparison.qualitative_state == QualitativeState::AtRisk => {
            HEART_RATE_AT_RISK
        }
        MetricTopic::HeartRate => HEART_RATE_MONITOR,
        MetricTopic::Sleep => SLEEP_HYGIENE,
        MetricTopic::Activity => ACTIVITY_GRADUAL,
        MetricTopic::Other => GENERIC_MONITOR,
    }
}
