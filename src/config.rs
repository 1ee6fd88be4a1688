//! Configuration loaded from the environment.
//!
//! `dotenvy` is invoked once at startup in `main`; everything here reads
//! plain env vars with sensible defaults so the engine runs with nothing
//! but `DATABASE_URL` set.

use std::time::Duration;

use rust_decimal::Decimal;

/// Connection settings for the Postgres store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    url: String,
    /// Maximum pool size.
    pub pool_size: usize,
}

impl DatabaseConfig {
    /// Load from `DATABASE_URL` / `DATABASE_POOL_SIZE`.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let url = std::env::var("DATABASE_URL")?;
        let pool_size = std::env::var("DATABASE_POOL_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8);
        Ok(Self { url, pool_size })
    }

    pub fn new(url: impl Into<String>, pool_size: usize) -> Self {
        Self {
            url: url.into(),
            pool_size,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Tunables for the prediction engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum valid samples required before a model can be trained.
    pub min_training_samples: usize,
    /// TTL for the trained-performance and historical-average caches.
    pub cache_ttl: Duration,
    /// Relative deviation from the historical average that triggers a
    /// variance warning. Informational only, never blocks persistence.
    pub max_prediction_variance: f64,
    /// Fallback rows at or below this amount are not persisted by the
    /// batch path. Zero keeps the historical skip-non-positive behavior.
    pub min_persist_amount: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_training_samples: 10,
            cache_ttl: Duration::from_secs(3600),
            max_prediction_variance: 0.3,
            min_persist_amount: Decimal::ZERO,
        }
    }
}

impl EngineConfig {
    /// Load from env, falling back to defaults field by field.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            min_training_samples: std::env::var("MIN_TRAINING_SAMPLES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_training_samples),
            cache_ttl: std::env::var("PREDICTION_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            max_prediction_variance: std::env::var("MAX_PREDICTION_VARIANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_prediction_variance),
            min_persist_amount: std::env::var("MIN_PERSIST_AMOUNT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_persist_amount),
        }
    }
}
