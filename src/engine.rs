//! Engine entry points
//!
//! [`InsightEngine`] bundles the per-athlete builders and the team
//! aggregator behind one configuration. All operations are synchronous and
//! pure given `now`; [`InsightEngine::refresh_roster_view`] adds the provider
//! refresh step in front of them.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use crate::config::EngineConfig;
use crate::models::{HealthData, InsightBundle, PlayerHealthSummary, RosterEntry, RosterView};
use crate::refresh::{RefreshedEntry, RosterRefresher};
use crate::summary::{HealthDataBuilder, PlayerHealthSummaryBuilder};
use crate::team::TeamAggregator;

#[derive(Debug, Clone)]
pub struct InsightEngine {
    config: EngineConfig,
    health: HealthDataBuilder,
    summaries: PlayerHealthSummaryBuilder,
    team: TeamAggregator,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            health: HealthDataBuilder::with_config(&config),
            summaries: PlayerHealthSummaryBuilder::new(),
            team: TeamAggregator::with_config(config.team.clone()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Athlete dashboard view for one bundle
    pub fn health_data(&self, bundle: InsightBundle, now: DateTime<Utc>) -> HealthData {
        self.health.build(bundle, now)
    }

    /// Roster row for one entry; a missing bundle counts as empty
    pub fn player_summary(&self, entry: &RosterEntry, now: DateTime<Utc>) -> PlayerHealthSummary {
        let bundle = entry.cached_insight_bundle.clone().unwrap_or_default();
        let health = self.health.build(bundle, now);
        self.summaries.build(entry, &health)
    }

    /// Coach view over the cached bundles of a roster
    pub fn roster_view(&self, roster: &[RosterEntry], now: DateTime<Utc>) -> RosterView {
        self.roster_view_with_previous(roster, None, now)
    }

    /// Coach view with a prior team average for the change indicator
    #[instrument(skip(self, roster, now), fields(athletes = roster.len()))]
    pub fn roster_view_with_previous(
        &self,
        roster: &[RosterEntry],
        previous_average: Option<f64>,
        now: DateTime<Utc>,
    ) -> RosterView {
        let players: Vec<PlayerHealthSummary> = roster
            .iter()
            .map(|entry| self.player_summary(entry, now))
            .collect();

        let team_statistics = self.team.aggregate_with_previous(&players, previous_average);
        debug!(players = players.len(), "Roster view built");

        RosterView {
            players,
            team_statistics,
        }
    }

    /// Refresh stale bundles, then build the coach view
    ///
    /// Returns the refreshed entries alongside the view so the caller can
    /// persist new bundles and sync times.
    pub async fn refresh_roster_view(
        &self,
        refresher: &RosterRefresher,
        roster: Vec<RosterEntry>,
        now: DateTime<Utc>,
    ) -> (RosterView, Vec<RefreshedEntry>) {
        let refreshed = refresher.refresh(roster, now).await;
        let entries: Vec<RosterEntry> = refreshed.iter().map(|r| r.entry.clone()).collect();
        (self.roster_view(&entries, now), refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{Comparison, HealthStatus, PlayerStatus};
    use crate::refresh::{InsightProvider, RefreshOutcome};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn bundle_with_percentile(percentile: f64) -> InsightBundle {
        InsightBundle {
            trends: vec![],
            comparisons: vec![Comparison {
                name: "Heart Rate Variability".to_string(),
                value: "55 ms".to_string(),
                qualitative_state: "good".into(),
                percentile: Some(percentile),
                ..Comparison::default()
            }],
        }
    }

    #[test]
    fn test_missing_bundle_is_empty_summary() {
        let engine = InsightEngine::new();
        let summary = engine.player_summary(&RosterEntry::new("1", "Ana", "Lopez"), now());

        assert_eq!(summary.health_score, 0);
        assert_eq!(summary.health_status, HealthStatus::Caution);
        assert_eq!(summary.status, PlayerStatus::Healthy);
        assert_eq!(summary.last_sync, "Never");
    }

    #[test]
    fn test_roster_view_counts_every_player() {
        let engine = InsightEngine::new();
        let synced = now() - Duration::minutes(1);
        let roster = vec![
            RosterEntry::new("1", "A", "One").with_bundle(bundle_with_percentile(90.0), synced),
            RosterEntry::new("2", "B", "Two").with_bundle(bundle_with_percentile(55.0), synced),
            RosterEntry::new("3", "C", "Three").with_bundle(bundle_with_percentile(40.0), synced),
        ];

        let view = engine.roster_view(&roster, now());

        assert_eq!(view.players.len(), 3);
        assert_eq!(view.team_statistics.total_athletes, 3);
        assert_eq!(view.team_statistics.avg_performance, 62);
        assert_eq!(view.team_statistics.at_risk_count, 2);
        assert_eq!(view.team_statistics.status_distribution.total(), 3);
    }

    #[test]
    fn test_previous_average_drives_change() {
        let engine = InsightEngine::new();
        let view = engine.roster_view_with_previous(&[], Some(70.0), now());
        assert_eq!(view.team_statistics.total_athletes, 0);
        assert_eq!(view.team_statistics.previous_average, Some(70.0));
    }

    struct AlwaysDown;

    #[async_trait]
    impl InsightProvider for AlwaysDown {
        async fn fetch(&self, _athlete_id: &str) -> Result<InsightBundle, ProviderError> {
            Err(ProviderError::RateLimited)
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_cached_bundle() {
        let engine = InsightEngine::new();
        let refresher = RosterRefresher::new(Arc::new(AlwaysDown), &engine.config().refresh);
        let roster = vec![RosterEntry::new("1", "A", "One")
            .with_bundle(bundle_with_percentile(90.0), now() - Duration::hours(2))];

        let (view, refreshed) = engine.refresh_roster_view(&refresher, roster, now()).await;

        assert_eq!(refreshed[0].outcome, RefreshOutcome::Failed(ProviderError::RateLimited));
        assert_eq!(view.players[0].health_score, 90);
    }
}
