// Library interface for TeamHealth modules
// The CLI and integration tests both go through these exports

pub mod alerts;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod logging;
pub mod models;
pub mod readiness;
pub mod refresh;
pub mod score;
pub mod summary;
pub mod team;

// Re-export commonly used types for convenience
pub use models::*;
pub use alerts::AlertGenerator;
pub use config::{BandFallback, EngineConfig, MergePolicy, ScoreBand, ScoringConfig};
pub use engine::InsightEngine;
pub use error::{IngestError, ProviderError, Result, TeamHealthError};
pub use extract::MetricExtractor;
pub use ingest::{bundle_from_value, parse_bundle};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use readiness::ReadinessClassifier;
pub use refresh::{
    AccessToken, AuthenticatedProvider, InsightFetcher, InsightProvider, RefreshOutcome,
    RefreshedEntry, RosterRefresher, TokenIssuer,
};
pub use score::ScoreCalculator;
pub use summary::{HealthDataBuilder, PlayerHealthSummaryBuilder};
pub use team::TeamAggregator;
