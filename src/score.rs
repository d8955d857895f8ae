//! Health score calculation
//!
//! Every comparison with a readable value contributes one 0-100 number: its
//! percentile when the provider supplied one, otherwise a value from the band
//! of its qualitative state. The health score is the rounded mean.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::classify;
use crate::config::{BandFallback, ScoreBand, ScoringConfig};
use crate::models::{Comparison, InsightBundle, QualitativeState};

/// Health score and its recent change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// 0-100
    pub health_score: u8,
    pub health_score_trend: f64,
    /// Comparisons with a readable value; 0 means the score carries no data
    pub contributions: usize,
}

/// Reduces an insight bundle to a single health score
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreCalculator {
    /// Calculator with the default bands and deterministic midpoints
    pub fn new() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Calculate score and trend
    ///
    /// In `Jitter` mode a configured seed makes repeated calls reproducible;
    /// without one each call draws fresh entropy.
    pub fn calculate(&self, bundle: &InsightBundle) -> ScoreResult {
        let (health_score, contributions) =
            match (self.config.band_fallback, self.config.jitter_seed) {
                (BandFallback::Jitter, Some(seed)) => {
                    self.score_parts(bundle, &mut StdRng::seed_from_u64(seed))
                }
                (BandFallback::Jitter, None) => self.score_parts(bundle, &mut rand::thread_rng()),
                (BandFallback::Midpoint, _) => self.score_parts(bundle, &mut NoRng),
            };

        ScoreResult {
            health_score,
            health_score_trend: Self::score_trend(bundle),
            contributions,
        }
    }

    /// Score using an explicit random source for band sampling
    pub fn score_with<R: BandSampler>(&self, bundle: &InsightBundle, rng: &mut R) -> u8 {
        self.score_parts(bundle, rng).0
    }

    fn score_parts<R: BandSampler>(&self, bundle: &InsightBundle, rng: &mut R) -> (u8, usize) {
        let contributions: Vec<f64> = bundle
            .comparisons
            .iter()
            .filter(|c| c.numeric_value().is_some())
            .map(|c| self.contribution(c, rng))
            .collect();

        if contributions.is_empty() {
            return (0, 0);
        }

        let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
        trace!(contributions = contributions.len(), mean, "Health score computed");
        (mean.round().clamp(0.0, 100.0) as u8, contributions.len())
    }

    fn contribution<R: BandSampler>(&self, comparison: &Comparison, rng: &mut R) -> f64 {
        if let Some(percentile) = comparison.percentile {
            return percentile.clamp(0.0, 100.0);
        }

        let band = self.band_for(&comparison.qualitative_state);
        match self.config.band_fallback {
            BandFallback::Midpoint => band.representative,
            BandFallback::Jitter => rng.sample_band(band),
        }
    }

    /// Band of a qualitative state; unknown states use the good band
    pub fn band_for(&self, state: &QualitativeState) -> &ScoreBand {
        match state {
            QualitativeState::Caution | QualitativeState::Warning => &self.config.caution_band,
            QualitativeState::AtRisk | QualitativeState::Poor | QualitativeState::Critical => {
                &self.config.at_risk_band
            }
            QualitativeState::Good
            | QualitativeState::Optimal
            | QualitativeState::Normal
            | QualitativeState::Unknown(_) => &self.config.good_band,
        }
    }

    /// Latest change of the last score trend that has points, or 0
    pub fn score_trend(bundle: &InsightBundle) -> f64 {
        bundle
            .trends
            .iter()
            .filter(|t| classify::is_score_trend(&t.name, &t.category))
            .filter_map(|t| t.latest_change())
            .last()
            .unwrap_or(0.0)
    }
}

/// Source of values inside a score band
pub trait BandSampler {
    fn sample_band(&mut self, band: &ScoreBand) -> f64;
}

impl<R: Rng> BandSampler for R {
    fn sample_band(&mut self, band: &ScoreBand) -> f64 {
        if band.min >= band.max {
            return band.min;
        }
        self.gen_range(band.min..=band.max)
    }
}

/// Sampler for midpoint mode, where no randomness is needed
struct NoRng;

impl BandSampler for NoRng {
    fn sample_band(&mut self, band: &ScoreBand) -> f64 {
        band.representative
    }
}
