//! Per-athlete composition
//!
//! [`HealthDataBuilder`] runs extraction, scoring, alerting and readiness over
//! one bundle and assembles the athlete dashboard view.
//! [`PlayerHealthSummaryBuilder`] projects that view, together with identity
//! from the roster, into the row a coach sees.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::alerts::AlertGenerator;
use crate::config::EngineConfig;
use crate::extract::MetricExtractor;
use crate::models::{
    HealthData, HealthStatus, InsightBundle, PlayerHealthSummary, PlayerStatus, ReadinessStatus,
    RosterEntry,
};
use crate::readiness::ReadinessClassifier;
use crate::score::ScoreCalculator;

/// Days off suggested for a caution recommendation ("3-5 days")
const CAUTION_RECOVERY_DAYS: u32 = 4;
/// Days off suggested when the athlete is not ready
const NOT_READY_RECOVERY_DAYS: u32 = 7;

/// Builds `HealthData` from an insight bundle
#[derive(Debug, Clone)]
pub struct HealthDataBuilder {
    extractor: MetricExtractor,
    scorer: ScoreCalculator,
    alerts: AlertGenerator,
    readiness: ReadinessClassifier,
    good_status_min: u8,
    caution_status_min: u8,
}

impl Default for HealthDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthDataBuilder {
    pub fn new() -> Self {
        Self::with_config(&EngineConfig::default())
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            extractor: MetricExtractor::with_policy(config.extraction.merge_policy),
            scorer: ScoreCalculator::with_config(config.scoring.clone()),
            alerts: AlertGenerator::new(),
            readiness: ReadinessClassifier::new(),
            good_status_min: config.scoring.good_status_min,
            caution_status_min: config.scoring.caution_status_min,
        }
    }

    /// Derive the dashboard view; `now` anchors the "last updated" text
    pub fn build(&self, bundle: InsightBundle, now: DateTime<Utc>) -> HealthData {
        let health_metrics = self.extractor.extract(&bundle);
        let score = self.scorer.calculate(&bundle);
        // Unreadable values carry no evidence either way
        let has_data = score.contributions > 0;
        let alerts = self.alerts.generate(&bundle);
        let return_to_play_status = self.readiness.classify(&bundle);

        let health_status = if has_data {
            health_status_for_score(
                score.health_score,
                self.good_status_min,
                self.caution_status_min,
            )
        } else {
            HealthStatus::Caution
        };

        let recovery_days_estimate = if has_data {
            recovery_days(return_to_play_status.status)
        } else {
            0
        };

        let last_updated = format_last_updated(latest_timestamp(&bundle), now);

        debug!(
            score = score.health_score,
            status = ?health_status,
            alerts = alerts.len(),
            readiness = ?return_to_play_status.status,
            "Health data built"
        );

        HealthData {
            health_score: score.health_score,
            health_score_trend: score.health_score_trend,
            recovery_days_estimate,
            last_updated,
            health_status,
            health_metrics,
            alerts,
            return_to_play_status,
            insights: bundle,
        }
    }
}

/// Status band for a score
pub fn health_status_for_score(score: u8, good_min: u8, caution_min: u8) -> HealthStatus {
    if score >= good_min {
        HealthStatus::Good
    } else if score >= caution_min {
        HealthStatus::Caution
    } else {
        HealthStatus::AtRisk
    }
}

fn recovery_days(readiness: ReadinessStatus) -> u32 {
    match readiness {
        ReadinessStatus::Ready => 0,
        ReadinessStatus::Caution => CAUTION_RECOVERY_DAYS,
        ReadinessStatus::NotReady => NOT_READY_RECOVERY_DAYS,
    }
}

/// Most recent timestamp on any trend point
pub fn latest_timestamp(bundle: &InsightBundle) -> Option<DateTime<Utc>> {
    bundle
        .trends
        .iter()
        .flat_map(|t| t.points.iter())
        .filter_map(|p| p.latest_timestamp())
        .max()
}

/// Human relative time, e.g. "5 minutes ago"; a date once older than a week
pub fn format_last_updated(latest: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(latest) = latest else {
        return "Never".to_string();
    };

    let elapsed = now.signed_duration_since(latest);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days <= 7 {
        plural(days, "day")
    } else {
        latest.format("%b %-d, %Y").to_string()
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

/// Roster label for a health status
pub fn player_status(health_status: HealthStatus) -> PlayerStatus {
    match health_status {
        HealthStatus::Good | HealthStatus::Caution => PlayerStatus::Healthy,
        HealthStatus::AtRisk => PlayerStatus::Injured,
    }
}

/// Builds roster rows from identity and health data
#[derive(Debug, Clone, Default)]
pub struct PlayerHealthSummaryBuilder;

impl PlayerHealthSummaryBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, entry: &RosterEntry, health: &HealthData) -> PlayerHealthSummary {
        let status = entry
            .status_override
            .unwrap_or_else(|| player_status(health.health_status));

        PlayerHealthSummary {
            id: entry.id.clone(),
            name: entry.display_name(),
            status,
            health_score: health.health_score,
            last_sync: health.last_updated.clone(),
            health_status: health.health_status,
            health_metrics: health.health_metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, Trend, TrendPoint};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn comparison(name: &str, state: &str, percentile: f64) -> Comparison {
        Comparison {
            name: name.to_string(),
            value: "1".to_string(),
            qualitative_state: state.into(),
            percentile: Some(percentile),
            ..Comparison::default()
        }
    }

    #[test]
    fn test_empty_bundle_defaults() {
        let health = HealthDataBuilder::new().build(InsightBundle::default(), now());

        assert_eq!(health.health_score, 0);
        assert_eq!(health.health_status, HealthStatus::Caution);
        assert_eq!(health.recovery_days_estimate, 0);
        assert_eq!(health.return_to_play_status.status, ReadinessStatus::Caution);
        assert_eq!(health.last_updated, "Never");
        assert!(health.alerts.is_empty());
    }

    #[test]
    fn test_full_bundle() {
        let bundle = InsightBundle {
            trends: vec![Trend {
                name: "Resting Heart Rate".to_string(),
                points: vec![TrendPoint {
                    end_time: Some(now() - Duration::hours(3)),
                    value: 52.0,
                    ..TrendPoint::default()
                }],
                ..Trend::default()
            }],
            comparisons: vec![
                comparison("Resting Heart Rate", "at_risk", 30.0),
                comparison("Sleep Duration", "good", 90.0),
            ],
        };

        let health = HealthDataBuilder::new().build(bundle, now());

        assert_eq!(health.health_score, 60);
        assert_eq!(health.health_status, HealthStatus::Caution);
        assert_eq!(health.return_to_play_status.status, ReadinessStatus::NotReady);
        assert_eq!(health.recovery_days_estimate, 7);
        assert_eq!(health.alerts.len(), 1);
        assert_eq!(health.last_updated, "3 hours ago");
        assert_eq!(health.insights.comparisons.len(), 2);
    }

    #[test]
    fn test_unreadable_values_are_not_at_risk() {
        let mut rhr = comparison("Resting Heart Rate", "good", 70.0);
        rhr.value = "n/a".to_string();
        let mut sleep = comparison("Sleep Duration", "optimal", 85.0);
        sleep.value = "--".to_string();
        let bundle = InsightBundle {
            trends: vec![],
            comparisons: vec![rhr, sleep],
        };

        let health = HealthDataBuilder::new().build(bundle, now());

        assert_eq!(health.health_score, 0);
        assert_eq!(health.health_status, HealthStatus::Caution);
        assert_eq!(health.recovery_days_estimate, 0);

        let summary =
            PlayerHealthSummaryBuilder::new().build(&RosterEntry::new("p-2", "Ari", "Lane"), &health);
        assert_eq!(summary.status, PlayerStatus::Healthy);
    }

    #[test]
    fn test_health_status_bands() {
        assert_eq!(health_status_for_score(95, 80, 60), HealthStatus::Good);
        assert_eq!(health_status_for_score(80, 80, 60), HealthStatus::Good);
        assert_eq!(health_status_for_score(79, 80, 60), HealthStatus::Caution);
        assert_eq!(health_status_for_score(60, 80, 60), HealthStatus::Caution);
        assert_eq!(health_status_for_score(59, 80, 60), HealthStatus::AtRisk);
        assert_eq!(health_status_for_score(0, 80, 60), HealthStatus::AtRisk);
    }

    #[test]
    fn test_relative_time_formatting() {
        let n = now();
        assert_eq!(format_last_updated(None, n), "Never");
        assert_eq!(format_last_updated(Some(n - Duration::seconds(20)), n), "Just now");
        assert_eq!(format_last_updated(Some(n + Duration::minutes(5)), n), "Just now");
        assert_eq!(format_last_updated(Some(n - Duration::minutes(1)), n), "1 minute ago");
        assert_eq!(format_last_updated(Some(n - Duration::minutes(45)), n), "45 minutes ago");
        assert_eq!(format_last_updated(Some(n - Duration::hours(1)), n), "1 hour ago");
        assert_eq!(format_last_updated(Some(n - Duration::hours(23)), n), "23 hours ago");
        assert_eq!(format_last_updated(Some(n - Duration::days(2)), n), "2 days ago");
        assert_eq!(format_last_updated(Some(n - Duration::days(7)), n), "7 days ago");
        assert_eq!(format_last_updated(Some(n - Duration::days(10)), n), "Jun 5, 2024");
    }

    #[test]
    fn test_summary_status_mapping_and_override() {
        let builder = HealthDataBuilder::new();
        let at_risk = builder.build(
            InsightBundle {
                trends: vec![],
                comparisons: vec![comparison("HRV", "poor", 20.0)],
            },
            now(),
        );
        assert_eq!(at_risk.health_status, HealthStatus::AtRisk);

        let entry = RosterEntry::new("p-1", "Sam", "Kerr");
        let summary = PlayerHealthSummaryBuilder::new().build(&entry, &at_risk);
        assert_eq!(summary.status, PlayerStatus::Injured);
        assert_eq!(summary.name, "Sam Kerr");
        assert_eq!(summary.last_sync, "Never");

        let mut suspended = entry.clone();
        suspended.status_override = Some(PlayerStatus::Suspended);
        let summary = PlayerHealthSummaryBuilder::new().build(&suspended, &at_risk);
        assert_eq!(summary.status, PlayerStatus::Suspended);

        assert_eq!(player_status(HealthStatus::Good), PlayerStatus::Healthy);
        assert_eq!(player_status(HealthStatus::Caution), PlayerStatus::Healthy);
    }
}
