//! Team aggregation for the coach roster view
//!
//! # Bar chart normalization
//!
//! Each bar is scaled to 0-100 with a fixed formula, then averaged over the
//! athletes that reported the metric:
//!
//! | Bar              | Input                 | Mapping                                   |
//! |------------------|-----------------------|-------------------------------------------|
//! | Resting HR       | bpm                   | 40 → 100, 100 → 0 (lower is better)       |
//! | HRV              | ms                    | 20 → 0, 100 → 100                         |
//! | Sleep Quality    | vendor score          | used as-is                                |
//! | Sleep Duration   | hours                 | 0 below 4h, ramp to 7h, 100 to 9h, -20/h  |
//! | Activity         | daily steps           | 0 → 0, 10 000 → 100, capped               |
//! | HR Recovery      | bpm drop              | 10 → 0, 50 → 100                          |
//! | Overall Recovery | health score          | used as-is                                |
//!
//! All values are clamped to 0-100.

use statrs::statistics::Statistics;
use tracing::info;

use crate::config::TeamConfig;
use crate::models::{MetricBar, PlayerHealthSummary, PlayerStatus, StatusDistribution, TeamStatistics};

pub const BAR_RESTING_HR: &str = "Resting HR";
pub const BAR_HRV: &str = "HRV";
pub const BAR_SLEEP_QUALITY: &str = "Sleep Quality";
pub const BAR_SLEEP_DURATION: &str = "Sleep Duration";
pub const BAR_ACTIVITY: &str = "Activity";
pub const BAR_HR_RECOVERY: &str = "HR Recovery";
pub const BAR_OVERALL_RECOVERY: &str = "Overall Recovery";

fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Resting heart rate, inverted over 40-100 bpm
pub fn normalize_resting_hr(bpm: f64) -> f64 {
    clamp_pct((100.0 - bpm) / 60.0 * 100.0)
}

/// HRV over 20-100 ms
pub fn normalize_hrv(ms: f64) -> f64 {
    clamp_pct((ms - 20.0) / 80.0 * 100.0)
}

/// Heart-rate recovery over 10-50 bpm
pub fn normalize_hr_recovery(bpm: f64) -> f64 {
    clamp_pct((bpm - 10.0) / 40.0 * 100.0)
}

pub fn normalize_sleep_quality(score: f64) -> f64 {
    clamp_pct(score)
}

/// Sleep duration: 7-9 hours is ideal
pub fn normalize_sleep_duration(hours: f64) -> f64 {
    if hours <= 4.0 {
        0.0
    } else if hours < 7.0 {
        clamp_pct((hours - 4.0) / 3.0 * 100.0)
    } else if hours <= 9.0 {
        100.0
    } else {
        clamp_pct(100.0 - (hours - 9.0) * 20.0)
    }
}

/// Daily steps against a 10 000 step target
pub fn normalize_steps(steps: f64) -> f64 {
    clamp_pct(steps / 10_000.0 * 100.0)
}

/// Collects normalized values for one bar
#[derive(Debug)]
struct BarAccumulator {
    label: &'static str,
    values: Vec<f64>,
}

impl BarAccumulator {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            values: Vec::new(),
        }
    }

    fn push(&mut self, value: Option<f64>, normalize: fn(f64) -> f64) {
        if let Some(v) = value {
            self.values.push(normalize(v));
        }
    }

    fn finish(self) -> MetricBar {
        let value = if self.values.is_empty() {
            0
        } else {
            self.values.iter().mean().round().clamp(0.0, 100.0) as u8
        };
        MetricBar {
            label: self.label.to_string(),
            value,
            contributors: self.values.len(),
        }
    }
}

/// Aggregates player summaries into team statistics
#[derive(Debug, Clone)]
pub struct TeamAggregator {
    config: TeamConfig,
}

impl Default for TeamAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamAggregator {
    pub fn new() -> Self {
        Self {
            config: TeamConfig::default(),
        }
    }

    pub fn with_config(config: TeamConfig) -> Self {
        Self { config }
    }

    /// Statistics without a historical baseline
    pub fn aggregate(&self, players: &[PlayerHealthSummary]) -> TeamStatistics {
        self.aggregate_with_previous(players, None)
    }

    /// Statistics compared against a caller-supplied prior team average
    pub fn aggregate_with_previous(
        &self,
        players: &[PlayerHealthSummary],
        previous_average: Option<f64>,
    ) -> TeamStatistics {
        if players.is_empty() {
            return TeamStatistics {
                previous_average,
                ..TeamStatistics::default()
            };
        }

        let scores: Vec<f64> = players.iter().map(|p| p.health_score as f64).collect();
        let avg_performance = scores.iter().mean().round().clamp(0.0, 100.0) as u8;

        let at_risk_count = players
            .iter()
            .filter(|p| p.health_score < self.config.at_risk_threshold)
            .count();

        let status_distribution = Self::status_distribution(players);
        let bar_chart_data = Self::bar_chart(players);

        let non_zero: Vec<f64> = bar_chart_data
            .iter()
            .filter(|bar| bar.value > 0)
            .map(|bar| bar.value as f64)
            .collect();
        let team_average = if non_zero.is_empty() {
            avg_performance
        } else {
            non_zero.iter().mean().round().clamp(0.0, 100.0) as u8
        };

        let average_change = previous_average
            .map(|prev| team_average as f64 - prev)
            .unwrap_or(0.0);

        info!(
            athletes = players.len(),
            avg_performance,
            at_risk_count,
            team_average,
            "Team statistics aggregated"
        );

        TeamStatistics {
            total_athletes: players.len(),
            avg_performance,
            at_risk_count,
            team_average,
            previous_average,
            average_change,
            bar_chart_data,
            status_distribution,
        }
    }

    /// Every player lands in exactly one bucket
    pub fn status_distribution(players: &[PlayerHealthSummary]) -> StatusDistribution {
        let mut distribution = StatusDistribution::default();
        for player in players {
            match player.status {
                PlayerStatus::Healthy => distribution.healthy += 1,
                PlayerStatus::Injured => distribution.injured += 1,
                PlayerStatus::Suspended => distribution.suspended += 1,
            }
        }
        distribution
    }

    /// The seven normalized metric bars
    pub fn bar_chart(players: &[PlayerHealthSummary]) -> Vec<MetricBar> {
        let mut resting_hr = BarAccumulator::new(BAR_RESTING_HR);
        let mut hrv = BarAccumulator::new(BAR_HRV);
        let mut sleep_quality = BarAccumulator::new(BAR_SLEEP_QUALITY);
        let mut sleep_duration = BarAccumulator::new(BAR_SLEEP_DURATION);
        let mut activity = BarAccumulator::new(BAR_ACTIVITY);
        let mut hr_recovery = BarAccumulator::new(BAR_HR_RECOVERY);
        let mut overall = BarAccumulator::new(BAR_OVERALL_RECOVERY);

        for player in players {
            let metrics = &player.health_metrics;
            resting_hr.push(metrics.resting_heart_rate.value, normalize_resting_hr);
            hrv.push(metrics.heart_rate_variability.value, normalize_hrv);
            sleep_quality.push(metrics.sleep.quality, normalize_sleep_quality);
            sleep_duration.push(metrics.sleep.duration_hours, normalize_sleep_duration);
            activity.push(metrics.activity.steps, normalize_steps);
            hr_recovery.push(metrics.heart_rate_recovery.value, normalize_hr_recovery);
            overall.push(Some(player.health_score as f64), clamp_pct);
        }

        vec![
            resting_hr.finish(),
            hrv.finish(),
            sleep_quality.finish(),
            sleep_duration.finish(),
            activity.finish(),
            hr_recovery.finish(),
            overall.finish(),
        ]
    }
}
