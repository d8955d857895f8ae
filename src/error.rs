//! Unified error hierarchy for TeamHealth
//!
//! The insight engine itself never fails: missing data, malformed values and
//! unknown vendor states all resolve to documented defaults. Errors only occur
//! at the edges, when ingesting provider payloads, talking to the provider,
//! or loading configuration.

use thiserror::Error;

/// Top-level error type for all TeamHealth operations
#[derive(Debug, Error)]
pub enum TeamHealthError {
    /// Provider payload could not be ingested
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// External provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors outside of bundle ingest
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while normalizing provider payloads into an insight bundle
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload is not valid JSON or does not resemble a bundle at all
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },

    /// Top-level payload is not a JSON object
    #[error("Expected a JSON object, found {found}")]
    NotAnObject { found: String },
}

/// Errors from the external wearable-data provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Token request rejected or failed
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    /// Request could not reach the provider
    #[error("Provider unavailable: {reason}")]
    Unavailable { reason: String },

    /// Provider throttled the request
    #[error("Rate limited by provider")]
    RateLimited,

    /// No data registered for the athlete at the provider
    #[error("Unknown athlete at provider: {athlete_id}")]
    UnknownAthlete { athlete_id: String },

    /// Call exceeded the caller's per-call timeout
    #[error("Provider call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Provider responded with something we could not read
    #[error("Invalid provider response: {reason}")]
    InvalidResponse { reason: String },
}

/// Result type alias for TeamHealth operations
pub type Result<T> = std::result::Result<T, TeamHealthError>;

impl ProviderError {
    /// Check if a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable { .. }
                | ProviderError::RateLimited
                | ProviderError::Timeout { .. }
        )
    }
}

impl TeamHealthError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            TeamHealthError::Provider(err) => err.is_retryable(),
            TeamHealthError::Io(_) => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TeamHealthError::Ingest(_) => ErrorSeverity::Warning,
            TeamHealthError::Provider(ProviderError::UnknownAthlete { .. }) => {
                ErrorSeverity::Warning
            }
            TeamHealthError::Provider(err) if err.is_retryable() => ErrorSeverity::Warning,
            TeamHealthError::Provider(_) => ErrorSeverity::Error,
            TeamHealthError::Configuration(_) => ErrorSeverity::Error,
            TeamHealthError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TeamHealthError::Provider(ProviderError::Authentication { .. }) => {
                "Could not authenticate with the health data provider. Please reconnect the account."
                    .to_string()
            }
            TeamHealthError::Provider(ProviderError::RateLimited) => {
                "The health data provider is busy. Showing the most recent saved data.".to_string()
            }
            TeamHealthError::Provider(ProviderError::Timeout { .. })
            | TeamHealthError::Provider(ProviderError::Unavailable { .. }) => {
                "Could not reach the health data provider. Showing the most recent saved data."
                    .to_string()
            }
            TeamHealthError::Ingest(_) => {
                "Health data from the provider could not be read.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
