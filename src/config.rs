use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TeamHealthError;
use crate::logging::LogConfig;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Health score calculation settings
    pub scoring: ScoringConfig,

    /// Metric extraction settings
    pub extraction: ExtractionConfig,

    /// Team aggregation settings
    pub team: TeamConfig,

    /// Provider refresh policy used by the roster refresher
    pub refresh: RefreshConfig,

    /// Logging output
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// How a comparison without a percentile is turned into a score contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandFallback {
    /// Fixed representative value per band (deterministic)
    Midpoint,
    /// Uniform sample within the band
    Jitter,
}

/// Score range associated with a coarse qualitative state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: f64,
    pub max: f64,
    /// Value used in `Midpoint` mode
    pub representative: f64,
}

impl ScoreBand {
    pub const fn new(min: f64, max: f64, representative: f64) -> Self {
        Self {
            min,
            max,
            representative,
        }
    }

    fn is_valid(&self) -> bool {
        (0.0..=100.0).contains(&self.min)
            && (0.0..=100.0).contains(&self.max)
            && self.min <= self.max
            && (self.min..=self.max).contains(&self.representative)
    }
}

/// Health score settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub band_fallback: BandFallback,

    /// Seed for `Jitter` mode; entropy from the OS when unset
    pub jitter_seed: Option<u64>,

    pub good_band: ScoreBand,
    pub caution_band: ScoreBand,
    pub at_risk_band: ScoreBand,

    /// Minimum score for a "good" health status
    pub good_status_min: u8,

    /// Minimum score for a "caution" health status; below is "at risk"
    pub caution_status_min: u8,
}

/// What to do when several comparisons land in the same metric slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The comparison seen last replaces earlier ones
    LastWriteWins,
    /// Values are averaged; state comes from the last comparison
    Average,
}

/// Metric extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub merge_policy: MergePolicy,
}

/// Team aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Athletes scoring strictly below this count as at risk
    pub at_risk_threshold: u8,
}

/// Provider refresh policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Cached bundles older than this are refreshed
    pub stale_after_secs: u64,

    /// Timeout applied to each provider call
    pub call_timeout_secs: u64,

    /// Access tokens are renewed this long before they expire
    pub token_refresh_margin_secs: u64,
}

impl RefreshConfig {
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_after_secs as i64)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn token_refresh_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_refresh_margin_secs as i64)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            metadata: ConfigMetadata::default(),
            scoring: ScoringConfig::default(),
            extraction: ExtractionConfig::default(),
            team: TeamConfig::default(),
            refresh: RefreshConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        ConfigMetadata {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            band_fallback: BandFallback::Midpoint,
            jitter_seed: None,
            good_band: ScoreBand::new(80.0, 95.0, 87.0),
            caution_band: ScoreBand::new(60.0, 75.0, 67.0),
            at_risk_band: ScoreBand::new(30.0, 50.0, 40.0),
            good_status_min: 80,
            caution_status_min: 60,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            merge_policy: MergePolicy::LastWriteWins,
        }
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        TeamConfig {
            at_risk_threshold: 60,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            stale_after_secs: 300,
            call_timeout_secs: 10,
            token_refresh_margin_secs: 60,
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".teamhealth")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Config file not usable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check internal consistency of the numeric settings
    pub fn validate(&self) -> crate::error::Result<()> {
        let scoring = &self.scoring;
        for (name, band) in [
            ("good_band", &scoring.good_band),
            ("caution_band", &scoring.caution_band),
            ("at_risk_band", &scoring.at_risk_band),
        ] {
            if !band.is_valid() {
                return Err(TeamHealthError::Configuration(format!(
                    "scoring.{} must satisfy 0 <= min <= representative <= max <= 100",
                    name
                )));
            }
        }

        if scoring.caution_status_min > scoring.good_status_min || scoring.good_status_min > 100 {
            return Err(TeamHealthError::Configuration(
                "scoring.caution_status_min must not exceed scoring.good_status_min (max 100)"
                    .to_string(),
            ));
        }

        if self.team.at_risk_threshold > 100 {
            return Err(TeamHealthError::Configuration(
                "team.at_risk_threshold must be within 0-100".to_string(),
            ));
        }

        if self.refresh.call_timeout_secs == 0 {
            return Err(TeamHealthError::Configuration(
                "refresh.call_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.scoring, deserialized.scoring);
        assert_eq!(config.refresh, deserialized.refresh);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [scoring]
            band_fallback = "jitter"
            jitter_seed = 7

            [refresh]
            stale_after_secs = 600
        "#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.scoring.band_fallback, BandFallback::Jitter);
        assert_eq!(config.scoring.jitter_seed, Some(7));
        assert_eq!(config.scoring.good_band, ScoreBand::new(80.0, 95.0, 87.0));
        assert_eq!(config.refresh.stale_after_secs, 600);
        assert_eq!(config.refresh.call_timeout_secs, 10);
        assert_eq!(config.team.at_risk_threshold, 60);
        assert_eq!(config.extraction.merge_policy, MergePolicy::LastWriteWins);
    }

    #[test]
    fn test_validation_rejects_inverted_band() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.scoring.caution_band = ScoreBand::new(75.0, 60.0, 67.0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.scoring.caution_status_min = 90;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.refresh.call_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = EngineConfig::default();
        original.team.at_risk_threshold = 55;
        original.extraction.merge_policy = MergePolicy::Average;

        original.save_to_file(&config_path).unwrap();
        let loaded = EngineConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.team.at_risk_threshold, 55);
        assert_eq!(loaded.extraction.merge_policy, MergePolicy::Average);
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[team]\nat_risk_threshold = 150\n").unwrap();

        assert!(EngineConfig::load_from_file(&config_path).is_err());
    }
}
