//! Roster refresh from the wearable-data provider
//!
//! The engine is pure; this module is the I/O step a route handler runs
//! before it. Bundles are refreshed only when missing or stale, all stale
//! athletes are fetched concurrently, and each call is bounded by its own
//! timeout. A failure for one athlete never affects the others: that athlete
//! keeps the last bundle it had, or none at all.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::config::RefreshConfig;
use crate::error::ProviderError;
use crate::models::{InsightBundle, RosterEntry};

/// Bearer token issued by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Usable at `now` with at least `margin` left before expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        now + margin < self.expires_at
    }
}

/// Obtains access tokens from the provider's auth endpoint
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self) -> Result<AccessToken, ProviderError>;
}

/// Fetches one athlete's insights with a given token
#[async_trait]
pub trait InsightFetcher: Send + Sync {
    async fn fetch_insights(
        &self,
        token: &str,
        athlete_id: &str,
    ) -> Result<InsightBundle, ProviderError>;
}

/// Source of fresh insight bundles
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn fetch(&self, athlete_id: &str) -> Result<InsightBundle, ProviderError>;
}

/// Provider client that owns its token cache
///
/// Tokens are reused until they come within `refresh_margin` of expiry. A
/// request rejected as unauthenticated drops the cached token and is retried
/// once with a new one.
pub struct AuthenticatedProvider<I, F> {
    issuer: I,
    fetcher: F,
    refresh_margin: ChronoDuration,
    token: Mutex<Option<AccessToken>>,
}

impl<I: TokenIssuer, F: InsightFetcher> AuthenticatedProvider<I, F> {
    pub fn new(issuer: I, fetcher: F, config: &RefreshConfig) -> Self {
        Self {
            issuer,
            fetcher,
            refresh_margin: config.token_refresh_margin(),
            token: Mutex::new(None),
        }
    }

    async fn current_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(Utc::now(), self.refresh_margin) {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting new provider access token");
        let fresh = self.issuer.issue_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Forget the cached token so the next call authenticates again
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl<I: TokenIssuer, F: InsightFetcher> InsightProvider for AuthenticatedProvider<I, F> {
    async fn fetch(&self, athlete_id: &str) -> Result<InsightBundle, ProviderError> {
        let token = self.current_token().await?;

        match self.fetcher.fetch_insights(&token, athlete_id).await {
            Err(ProviderError::Authentication { reason }) => {
                warn!(athlete_id, %reason, "Provider rejected token, re-authenticating");
                self.invalidate_token().await;
                let token = self.current_token().await?;
                self.fetcher.fetch_insights(&token, athlete_id).await
            }
            other => other,
        }
    }
}

/// What happened to one athlete during a refresh
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Cached bundle was recent enough
    Fresh,
    /// New bundle fetched from the provider
    Refreshed,
    /// Fetch failed; the last known bundle (if any) is kept
    Failed(ProviderError),
}

/// Roster entry after the refresh step
#[derive(Debug, Clone)]
pub struct RefreshedEntry {
    pub entry: RosterEntry,
    pub outcome: RefreshOutcome,
}

impl RefreshedEntry {
    /// Bundle to run the engine on; empty when nothing was ever fetched
    pub fn bundle(&self) -> InsightBundle {
        self.entry.cached_insight_bundle.clone().unwrap_or_default()
    }
}

/// Applies the staleness policy and fans out provider calls
pub struct RosterRefresher {
    provider: Arc<dyn InsightProvider>,
    stale_after: ChronoDuration,
    call_timeout: Duration,
}

impl RosterRefresher {
    pub fn new(provider: Arc<dyn InsightProvider>, config: &RefreshConfig) -> Self {
        Self {
            provider,
            stale_after: config.stale_after(),
            call_timeout: config.call_timeout(),
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Missing bundles, missing sync times and old syncs are stale
    pub fn is_stale(&self, entry: &RosterEntry, now: DateTime<Utc>) -> bool {
        match (&entry.cached_insight_bundle, entry.last_synced_at) {
            (Some(_), Some(synced_at)) => now.signed_duration_since(synced_at) > self.stale_after,
            _ => true,
        }
    }

    /// Refresh every stale entry concurrently; order is preserved
    #[instrument(skip_all, fields(athletes = roster.len()))]
    pub async fn refresh(&self, roster: Vec<RosterEntry>, now: DateTime<Utc>) -> Vec<RefreshedEntry> {
        let results = join_all(roster.into_iter().map(|entry| self.refresh_one(entry, now))).await;

        let refreshed = results
            .iter()
            .filter(|r| r.outcome == RefreshOutcome::Refreshed)
            .count();
        let failed = results
            .iter()
            .filter(|r| matches!(r.outcome, RefreshOutcome::Failed(_)))
            .count();
        info!(refreshed, failed, "Roster refresh finished");

        results
    }

    async fn refresh_one(&self, mut entry: RosterEntry, now: DateTime<Utc>) -> RefreshedEntry {
        if !self.is_stale(&entry, now) {
            return RefreshedEntry {
                entry,
                outcome: RefreshOutcome::Fresh,
            };
        }

        let call = self.provider.fetch(&entry.id);
        let outcome = match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(bundle)) => {
                entry.cached_insight_bundle = Some(bundle);
                entry.last_synced_at = Some(now);
                RefreshOutcome::Refreshed
            }
            Ok(Err(err)) => RefreshOutcome::Failed(err),
            Err(_) => RefreshOutcome::Failed(ProviderError::Timeout {
                seconds: self.call_timeout.as_secs(),
            }),
        };

        if let RefreshOutcome::Failed(err) = &outcome {
            warn!(
                athlete_id = %entry.id,
                error = %err,
                has_cached = entry.cached_insight_bundle.is_some(),
                "Insight refresh failed, using last known bundle"
            );
        }

        RefreshedEntry { entry, outcome }
    }
}
