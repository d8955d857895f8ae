//! Metric extraction
//!
//! Pulls the five dashboard metrics out of an insight bundle. Comparisons
//! supply values, states and a baseline-relative change; trends classified
//! into the same slot then refine the change with their latest
//! period-over-period percentage.

use tracing::debug;

use crate::classify::{self, ActivityField, MetricSlot, SleepField};
use crate::config::MergePolicy;
use crate::models::{
    ActivityMetrics, HealthMetrics, InsightBundle, MetricReading, MetricStatus, QualitativeState,
    SleepMetrics,
};

/// Map a vendor state onto the three-way metric status
///
/// Unknown or missing states are treated as good so that an unfamiliar vendor
/// label never hides a metric.
pub fn metric_status(state: &QualitativeState) -> MetricStatus {
    match state {
        QualitativeState::Good | QualitativeState::Optimal | QualitativeState::Normal => {
            MetricStatus::Good
        }
        QualitativeState::Caution | QualitativeState::Warning => MetricStatus::Caution,
        QualitativeState::AtRisk | QualitativeState::Poor | QualitativeState::Critical => {
            MetricStatus::AtRisk
        }
        QualitativeState::Unknown(_) => MetricStatus::Good,
    }
}

/// Running values for one numeric field
#[derive(Debug, Default)]
struct FieldAccumulator {
    last: Option<f64>,
    sum: f64,
    count: u32,
}

impl FieldAccumulator {
    fn push(&mut self, value: f64) {
        self.last = Some(value);
        self.sum += value;
        self.count += 1;
    }

    fn resolve(&self, policy: MergePolicy) -> Option<f64> {
        match policy {
            MergePolicy::LastWriteWins => self.last,
            MergePolicy::Average if self.count > 0 => Some(self.sum / self.count as f64),
            MergePolicy::Average => None,
        }
    }
}

/// Trend and status of a slot; always last-write-wins
#[derive(Debug, Default)]
struct SlotMeta {
    trend: f64,
    status: MetricStatus,
}

#[derive(Debug, Default)]
struct Accumulators {
    resting_hr: FieldAccumulator,
    hrv: FieldAccumulator,
    sleep_duration: FieldAccumulator,
    sleep_quality: FieldAccumulator,
    steps: FieldAccumulator,
    active_minutes: FieldAccumulator,
    hr_recovery: FieldAccumulator,

    resting_hr_meta: SlotMeta,
    hrv_meta: SlotMeta,
    sleep_meta: SlotMeta,
    activity_meta: SlotMeta,
    hr_recovery_meta: SlotMeta,
}

impl Accumulators {
    fn field(&mut self, slot: MetricSlot) -> &mut FieldAccumulator {
        match slot {
            MetricSlot::RestingHeartRate => &mut self.resting_hr,
            MetricSlot::HeartRateVariability => &mut self.hrv,
            MetricSlot::Sleep(SleepField::Duration) => &mut self.sleep_duration,
            MetricSlot::Sleep(SleepField::Quality) => &mut self.sleep_quality,
            MetricSlot::Activity(ActivityField::Steps) => &mut self.steps,
            MetricSlot::Activity(ActivityField::ActiveMinutes) => &mut self.active_minutes,
            MetricSlot::HeartRateRecovery => &mut self.hr_recovery,
        }
    }

    fn meta(&mut self, slot: MetricSlot) -> &mut SlotMeta {
        match slot {
            MetricSlot::RestingHeartRate => &mut self.resting_hr_meta,
            MetricSlot::HeartRateVariability => &mut self.hrv_meta,
            MetricSlot::Sleep(_) => &mut self.sleep_meta,
            MetricSlot::Activity(_) => &mut self.activity_meta,
            MetricSlot::HeartRateRecovery => &mut self.hr_recovery_meta,
        }
    }
}

/// Extracts `HealthMetrics` from an insight bundle
#[derive(Debug, Clone)]
pub struct MetricExtractor {
    merge_policy: MergePolicy,
}

impl Default for MetricExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricExtractor {
    /// Extractor with last-write-wins merging
    pub fn new() -> Self {
        Self {
            merge_policy: MergePolicy::LastWriteWins,
        }
    }

    pub fn with_policy(merge_policy: MergePolicy) -> Self {
        Self { merge_policy }
    }

    /// Build all five metric slots; unfilled slots keep their defaults
    pub fn extract(&self, bundle: &InsightBundle) -> HealthMetrics {
        let mut acc = Accumulators::default();

        for comparison in &bundle.comparisons {
            let Some(raw_value) = comparison.numeric_value() else {
                debug!(
                    name = %comparison.name,
                    value = %comparison.value,
                    "Skipping comparison without a numeric value"
                );
                continue;
            };

            let Some(slot) = classify::classify_metric(&comparison.name, &comparison.category)
            else {
                continue;
            };

            let value = match slot {
                MetricSlot::Sleep(SleepField::Duration) => {
                    sleep_hours(raw_value, &comparison.unit)
                }
                _ => raw_value,
            };

            acc.field(slot).push(value);

            let meta = acc.meta(slot);
            meta.status = metric_status(&comparison.qualitative_state);
            meta.trend = classify::parse_numeric(&comparison.percentage_difference).unwrap_or(0.0);
        }

        for trend in &bundle.trends {
            let Some(change) = trend.latest_change() else {
                continue;
            };
            if let Some(slot) = classify::classify_metric(&trend.name, &trend.category) {
                acc.meta(slot).trend = change;
            }
        }

        let policy = self.merge_policy;
        HealthMetrics {
            resting_heart_rate: reading(&acc.resting_hr, &acc.resting_hr_meta, policy),
            heart_rate_variability: reading(&acc.hrv, &acc.hrv_meta, policy),
            sleep: SleepMetrics {
                duration_hours: acc.sleep_duration.resolve(policy),
                quality: acc.sleep_quality.resolve(policy),
                trend: acc.sleep_meta.trend,
                status: acc.sleep_meta.status,
            },
            activity: ActivityMetrics {
                steps: acc.steps.resolve(policy),
                active_minutes: acc.active_minutes.resolve(policy),
                trend: acc.activity_meta.trend,
                status: acc.activity_meta.status,
            },
            heart_rate_recovery: reading(&acc.hr_recovery, &acc.hr_recovery_meta, policy),
        }
    }
}

fn reading(field: &FieldAccumulator, meta: &SlotMeta, policy: MergePolicy) -> MetricReading {
    MetricReading {
        value: field.resolve(policy),
        trend: meta.trend,
        status: meta.status,
    }
}

/// Sleep duration in hours; minute readings are converted
///
/// Values above 24 cannot be hours and are read as minutes even when the
/// vendor left the unit blank.
fn sleep_hours(value: f64, unit: &str) -> f64 {
    if classify::is_minutes_unit(unit) || value > 24.0 {
        value / 60.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, Trend, TrendPoint};

    fn comparison(name: &str, value: &str, state: &str) -> Comparison {
        Comparison {
            name: name.to_string(),
            value: value.to_string(),
            qualitative_state: state.into(),
            ..Comparison::default()
        }
    }

    #[test]
    fn test_empty_bundle_yields_defaults() {
        let metrics = MetricExtractor::new().extract(&InsightBundle::default());
        assert_eq!(metrics, HealthMetrics::default());
        assert_eq!(metrics.resting_heart_rate.value, None);
        assert_eq!(metrics.resting_heart_rate.trend, 0.0);
        assert_eq!(metrics.resting_heart_rate.status, MetricStatus::Good);
    }

    #[test]
    fn test_extracts_all_slots() {
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![
                comparison("Resting Heart Rate", "52 bpm", "good"),
                comparison("Heart Rate Variability", "64 ms", "caution"),
                comparison("Sleep Duration", "7.5h", "optimal"),
                comparison("Sleep Quality Score", "82", "normal"),
                comparison("Daily Steps", "9,500", "warning"),
                comparison("Active Minutes", "45 min", "good"),
                comparison("Heart Rate Recovery", "28 bpm", "at_risk"),
            ],
        };

        let metrics = MetricExtractor::new().extract(&bundle);

        assert_eq!(metrics.resting_heart_rate.value, Some(52.0));
        assert_eq!(metrics.heart_rate_variability.value, Some(64.0));
        assert_eq!(metrics.heart_rate_variability.status, MetricStatus::Caution);
        assert_eq!(metrics.sleep.duration_hours, Some(7.5));
        assert_eq!(metrics.sleep.quality, Some(82.0));
        assert_eq!(metrics.activity.steps, Some(9500.0));
        assert_eq!(metrics.activity.active_minutes, Some(45.0));
        // last comparison written to the activity slot sets its status
        assert_eq!(metrics.activity.status, MetricStatus::Good);
        assert_eq!(metrics.heart_rate_recovery.value, Some(28.0));
        assert_eq!(metrics.heart_rate_recovery.status, MetricStatus::AtRisk);
    }

    #[test]
    fn test_unparsable_values_are_skipped() {
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![
                comparison("Resting Heart Rate", "55", "good"),
                comparison("Resting Heart Rate", "n/a", "at_risk"),
            ],
        };

        let metrics = MetricExtractor::new().extract(&bundle);
        assert_eq!(metrics.resting_heart_rate.value, Some(55.0));
        assert_eq!(metrics.resting_heart_rate.status, MetricStatus::Good);
    }

    #[test]
    fn test_last_write_wins_and_average_policy() {
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![
                comparison("Resting Heart Rate", "50", "good"),
                comparison("Resting Heart Rate", "60", "caution"),
            ],
        };

        let last = MetricExtractor::new().extract(&bundle);
        assert_eq!(last.resting_heart_rate.value, Some(60.0));
        assert_eq!(last.resting_heart_rate.status, MetricStatus::Caution);

        let averaged = MetricExtractor::with_policy(MergePolicy::Average).extract(&bundle);
        assert_eq!(averaged.resting_heart_rate.value, Some(55.0));
        assert_eq!(averaged.resting_heart_rate.status, MetricStatus::Caution);
    }

    #[test]
    fn test_unknown_state_fails_open() {
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![comparison("HRV", "40", "elevated")],
        };
        let metrics = MetricExtractor::new().extract(&bundle);
        assert_eq!(metrics.heart_rate_variability.status, MetricStatus::Good);
    }

    #[test]
    fn test_sleep_minutes_converted_to_hours() {
        let mut minutes = comparison("Total Sleep Time", "450", "good");
        minutes.unit = "min".to_string();
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![minutes],
        };
        let metrics = MetricExtractor::new().extract(&bundle);
        assert_eq!(metrics.sleep.duration_hours, Some(7.5));
    }

    #[test]
    fn test_trend_changes_override_comparison_difference() {
        let mut rhr = comparison("Resting Heart Rate", "52", "good");
        rhr.percentage_difference = "-4%".to_string();
        let mut steps = comparison("Daily Steps", "8000", "good");
        steps.percentage_difference = "+12.5%".to_string();

        let bundle = InsightBundle {
            trends: vec![Trend {
                name: "Resting Heart Rate".to_string(),
                points: vec![
                    TrendPoint {
                        percent_change_from_previous: 1.0,
                        ..TrendPoint::default()
                    },
                    TrendPoint {
                        percent_change_from_previous: -2.0,
                        ..TrendPoint::default()
                    },
                ],
                ..Trend::default()
            }],
            comparisons: vec![rhr, steps],
        };

        let metrics = MetricExtractor::new().extract(&bundle);
        assert_eq!(metrics.resting_heart_rate.trend, -2.0);
        assert_eq!(metrics.activity.trend, 12.5);
    }

    #[test]
    fn test_hrv_in_recovery_category_stays_hrv() {
        let mut hrv = comparison("Heart Rate Variability", "65 ms", "good");
        hrv.category = "recovery".to_string();

        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![hrv],
        };

        let metrics = MetricExtractor::new().extract(&bundle);
        assert_eq!(metrics.heart_rate_variability.value, Some(65.0));
        assert_eq!(metrics.heart_rate_recovery.value, None);
    }
}
