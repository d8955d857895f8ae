//! Core data types for the insight engine
//!
//! The first half of this module mirrors the provider's insight bundle after
//! ingest normalization. The second half holds the derived, read-only views
//! the engine produces for athletes and coaches. Everything serializes with
//! camelCase field names to match the API the mobile client consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::classify;

/// One sampling window of a trend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub value: f64,
    pub percent_change_from_previous: f64,
}

impl TrendPoint {
    /// Latest timestamp this point carries, preferring the window end
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(start.max(end)),
            (start, end) => end.or(start),
        }
    }
}

/// A named metric sampled over successive windows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Trend {
    pub category: String,
    pub name: String,
    pub qualitative_state: QualitativeState,
    pub is_higher_better: bool,
    pub value_range: f64,
    pub unit: String,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    /// Ordered by time, oldest first
    pub points: Vec<TrendPoint>,
}

impl Trend {
    /// Percent change of the most recent point, if any
    pub fn latest_change(&self) -> Option<f64> {
        self.points.last().map(|p| p.percent_change_from_previous)
    }
}

/// Auxiliary breakdown attached to a comparison
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonPoint {
    #[serde(rename = "type")]
    pub point_type: String,
    pub value: String,
}

/// A metric's standing against a baseline population or personal history
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comparison {
    pub category: String,
    pub name: String,
    /// Vendor-formatted value such as "52 bpm" or "7.5h"
    pub value: String,
    pub unit: String,
    pub is_higher_better: bool,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
    pub percentile: Option<f64>,
    pub difference: String,
    pub percentage_difference: String,
    pub qualitative_state: QualitativeState,
    pub properties: BTreeMap<String, serde_json::Value>,
    pub points: Vec<ComparisonPoint>,
}

impl Comparison {
    /// Numeric reading of `value`, if it has one
    pub fn numeric_value(&self) -> Option<f64> {
        classify::parse_numeric(&self.value)
    }
}

/// The unit exchanged with the external provider
///
/// Both lists may be empty for a new athlete; that is a valid state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightBundle {
    pub trends: Vec<Trend>,
    pub comparisons: Vec<Comparison>,
}

impl InsightBundle {
    pub fn is_empty(&self) -> bool {
        self.trends.is_empty() && self.comparisons.is_empty()
    }
}

/// Vendor-supplied coarse label on a trend or comparison
///
/// Unrecognized labels are kept verbatim in `Unknown` so the raw bundle
/// round-trips for auditing; every consumer treats them as `Good`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum QualitativeState {
    Good,
    Optimal,
    Normal,
    Caution,
    Warning,
    AtRisk,
    Poor,
    Critical,
    Unknown(String),
}

impl Default for QualitativeState {
    fn default() -> Self {
        QualitativeState::Unknown(String::new())
    }
}

impl QualitativeState {
    /// Vendor spelling of the state
    pub fn as_str(&self) -> &str {
        match self {
            QualitativeState::Good => "good",
            QualitativeState::Optimal => "optimal",
            QualitativeState::Normal => "normal",
            QualitativeState::Caution => "caution",
            QualitativeState::Warning => "warning",
            QualitativeState::AtRisk => "at_risk",
            QualitativeState::Poor => "poor",
            QualitativeState::Critical => "critical",
            QualitativeState::Unknown(raw) => raw,
        }
    }
}

impl From<String> for QualitativeState {
    fn from(raw: String) -> Self {
        classify::parse_state(&raw)
    }
}

impl From<&str> for QualitativeState {
    fn from(raw: &str) -> Self {
        classify::parse_state(raw)
    }
}

impl Serialize for QualitativeState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for QualitativeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three-way status for a single health metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricStatus {
    #[default]
    Good,
    Caution,
    AtRisk,
}

/// A single-valued metric slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReading {
    pub value: Option<f64>,
    /// Period-over-period change in percent
    pub trend: f64,
    pub status: MetricStatus,
}

/// Sleep slot: duration and quality are filled independently
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepMetrics {
    pub duration_hours: Option<f64>,
    /// Vendor sleep score, already 0-100
    pub quality: Option<f64>,
    pub trend: f64,
    pub status: MetricStatus,
}

/// Activity slot: daily steps and active minutes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMetrics {
    pub steps: Option<f64>,
    pub active_minutes: Option<f64>,
    pub trend: f64,
    pub status: MetricStatus,
}

/// The five physiological metrics shown on dashboards
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub resting_heart_rate: MetricReading,
    pub heart_rate_variability: MetricReading,
    pub sleep: SleepMetrics,
    pub activity: ActivityMetrics,
    pub heart_rate_recovery: MetricReading,
}

/// Overall health status derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealthStatus {
    Good,
    Caution,
    AtRisk,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Good => write!(f, "Good"),
            HealthStatus::Caution => write!(f, "Caution"),
            HealthStatus::AtRisk => write!(f, "At Risk"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Info,
}

/// Human-visible warning raised from a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// 1-based position in the alert list
    pub id: u32,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub recommendation: String,
    /// Name of the comparison that raised the alert
    pub metric: String,
}

/// Return-to-play recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadinessStatus {
    Ready,
    Caution,
    NotReady,
}

impl std::fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessStatus::Ready => write!(f, "Ready"),
            ReadinessStatus::Caution => write!(f, "Caution"),
            ReadinessStatus::NotReady => write!(f, "Not Ready"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnToPlay {
    pub status: ReadinessStatus,
    pub message: String,
    pub details: String,
}

/// Everything the athlete dashboard shows, derived from one bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    /// 0-100
    pub health_score: u8,
    pub health_score_trend: f64,
    pub recovery_days_estimate: u32,
    /// Relative time of the newest trend point, e.g. "3 hours ago"
    pub last_updated: String,
    pub health_status: HealthStatus,
    pub health_metrics: HealthMetrics,
    pub alerts: Vec<Alert>,
    pub return_to_play_status: ReturnToPlay,
    /// Source bundle, kept for audit and debugging
    pub insights: InsightBundle,
}

/// Roster label shown to coaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum PlayerStatus {
    Healthy,
    Injured,
    Suspended,
}

impl PlayerStatus {
    /// Parse a roster label; anything unrecognized is `Healthy`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "injured" => PlayerStatus::Injured,
            "suspended" => PlayerStatus::Suspended,
            _ => PlayerStatus::Healthy,
        }
    }
}

impl From<String> for PlayerStatus {
    fn from(raw: String) -> Self {
        PlayerStatus::parse(&raw)
    }
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Healthy => write!(f, "Healthy"),
            PlayerStatus::Injured => write!(f, "Injured"),
            PlayerStatus::Suspended => write!(f, "Suspended"),
        }
    }
}

/// Roster-facing projection of `HealthData`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHealthSummary {
    pub id: String,
    pub name: String,
    pub status: PlayerStatus,
    pub health_score: u8,
    pub last_sync: String,
    pub health_status: HealthStatus,
    pub health_metrics: HealthMetrics,
}

/// One bar of the team chart, normalized to 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricBar {
    pub label: String,
    pub value: u8,
    /// Athletes that reported this metric
    pub contributors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub healthy: usize,
    pub injured: usize,
    pub suspended: usize,
}

impl StatusDistribution {
    pub fn total(&self) -> usize {
        self.healthy + self.injured + self.suspended
    }
}

/// Roster-wide aggregation for the coach view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStatistics {
    pub total_athletes: usize,
    pub avg_performance: u8,
    pub at_risk_count: usize,
    pub team_average: u8,
    pub previous_average: Option<f64>,
    pub average_change: f64,
    pub bar_chart_data: Vec<MetricBar>,
    pub status_distribution: StatusDistribution,
}

/// One roster member as handed over by the roster collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RosterEntry {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub cached_insight_bundle: Option<InsightBundle>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Label set by staff (e.g. a suspension) that overrides the derived one
    pub status_override: Option<PlayerStatus>,
}

impl RosterEntry {
    pub fn new(id: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    pub fn with_bundle(mut self, bundle: InsightBundle, synced_at: DateTime<Utc>) -> Self {
        self.cached_insight_bundle = Some(bundle);
        self.last_synced_at = Some(synced_at);
        self
    }

    /// "First Last", trimmed when either part is missing
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Coach roster view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterView {
    pub players: Vec<PlayerHealthSummary>,
    pub team_statistics: TeamStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_qualitative_state_round_trip_keeps_unknown_label() {
        let json = r#"["at_risk","Optimal","elevated"]"#;
        let states: Vec<QualitativeState> = serde_json::from_str(json).unwrap();
        assert_eq!(states[0], QualitativeState::AtRisk);
        assert_eq!(states[1], QualitativeState::Optimal);
        assert_eq!(states[2], QualitativeState::Unknown("elevated".to_string()));

        let back = serde_json::to_string(&states).unwrap();
        assert_eq!(back, r#"["at_risk","optimal","elevated"]"#);
    }

    #[test]
    fn test_player_status_unrecognized_is_healthy() {
        let status: PlayerStatus = serde_json::from_str(r#""On Loan""#).unwrap();
        assert_eq!(status, PlayerStatus::Healthy);
        let status: PlayerStatus = serde_json::from_str(r#""Suspended""#).unwrap();
        assert_eq!(status, PlayerStatus::Suspended);
        assert_eq!(serde_json::to_string(&PlayerStatus::Injured).unwrap(), r#""Injured""#);
    }

    #[test]
    fn test_health_metrics_serialize_camel_case() {
        let json = serde_json::to_value(HealthMetrics::default()).unwrap();
        assert!(json.get("restingHeartRate").is_some());
        assert_eq!(json["sleep"]["durationHours"], serde_json::Value::Null);
        assert_eq!(json["heartRateRecovery"]["status"], "good");
    }

    #[test]
    fn test_trend_point_latest_timestamp_prefers_end() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let point = TrendPoint {
            start_time: Some(start),
            end_time: Some(end),
            ..TrendPoint::default()
        };
        assert_eq!(point.latest_timestamp(), Some(end));
        assert_eq!(TrendPoint::default().latest_timestamp(), None);
    }

    #[test]
    fn test_roster_entry_display_name() {
        assert_eq!(RosterEntry::new("1", "Ada", "Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(RosterEntry::new("2", "Pelé", "").display_name(), "Pelé");
    }
}
