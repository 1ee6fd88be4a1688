//! In-sample validation metrics and reliability classification.
//!
//! Metrics are computed over the training data itself (no held-out split),
//! so they are optimistic upper bounds, not generalization guarantees.
//! Callers gate reliability and scale confidence with them anyway; that
//! trade-off is deliberate and documented.

use chrono::{DateTime, Utc};

/// Four-tier classification of a model's in-sample MAPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Reliability {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl Reliability {
    /// MAPE < 15 Excellent, < 30 Good, < 50 Acceptable, else Poor.
    pub fn from_mape(mape: f64) -> Self {
        if mape < 15.0 {
            Self::Excellent
        } else if mape < 30.0 {
            Self::Good
        } else if mape < 50.0 {
            Self::Acceptable
        } else {
            Self::Poor
        }
    }

    /// Good or better.
    pub fn is_reliable(&self) -> bool {
        matches!(self, Self::Excellent | Self::Good)
    }

    /// Baseline confidence associated with this tier.
    pub fn confidence_baseline(&self) -> f64 {
        match self {
            Self::Excellent => 0.9,
            Self::Good => 0.7,
            Self::Acceptable | Self::Poor => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Acceptable => "Acceptable",
            Self::Poor => "Poor",
        }
    }
}

/// Validation summary for a trained category model. Cached per category
/// with a one-hour TTL to avoid retraining on every call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelPerformance {
    pub model_id: String,
    /// Mean absolute error over all points.
    pub mae: f64,
    /// Root mean squared error over labels > 0.
    pub rmse: f64,
    /// Mean absolute percentage error over labels > 0; 100 when no label
    /// qualifies.
    pub mape: f64,
    /// Mean absolute error restricted to labels > 0.
    pub avg_absolute_error: f64,
    pub sample_count: usize,
    /// How many labels were > 0 and entered the percentage metrics.
    pub valid_predictions: usize,
    pub trained_at: DateTime<Utc>,
    pub reliability: Reliability,
    pub is_reliable: bool,
    pub confidence_baseline: f64,
}

/// Score in-sample predictions against true labels.
pub fn validate(model_id: &str, predictions: &[f64], labels: &[f64]) -> ModelPerformance {
    let n = predictions.len().min(labels.len());

    let mae = if n > 0 {
        predictions
            .iter()
            .zip(labels)
            .take(n)
            .map(|(p, y)| (p - y).abs())
            .sum::<f64>()
            / n as f64
    } else {
        0.0
    };

    // RMSE / MAPE / avg abs error only make sense against positive labels.
    let mut sq_sum = 0.0;
    let mut abs_sum = 0.0;
    let mut pct_sum = 0.0;
    let mut valid = 0usize;
    for (p, y) in predictions.iter().zip(labels).take(n) {
        if *y > 0.0 {
            let err = p - y;
            sq_sum += err * err;
            abs_sum += err.abs();
            pct_sum += err.abs() / y * 100.0;
            valid += 1;
        }
    }

    let rmse = if valid > 0 {
        (sq_sum / valid as f64).sqrt()
    } else {
        0.0
    };
    // Worst case, not zero: an unvalidatable model must not look perfect.
    let mape = if valid > 0 { pct_sum / valid as f64 } else { 100.0 };
    let avg_absolute_error = if valid > 0 { abs_sum / valid as f64 } else { 0.0 };

    let reliability = Reliability::from_mape(mape);
    ModelPerformance {
        model_id: model_id.to_string(),
        mae: round2(mae),
        rmse: round2(rmse),
        mape: round2(mape),
        avg_absolute_error: round2(avg_absolute_error),
        sample_count: n,
        valid_predictions: valid,
        trained_at: Utc::now(),
        reliability,
        is_reliable: reliability.is_reliable(),
        confidence_baseline: reliability.confidence_baseline(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
