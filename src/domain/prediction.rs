//! Persisted predictions and their provenance.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A persisted cost prediction.
///
/// At most one current prediction exists per
/// (operation, category, target_date); re-prediction upserts by that
/// composite key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub operation_id: Uuid,
    pub category_id: Uuid,
    /// Non-negative, rounded to 2 decimal places.
    pub predicted_amount: Decimal,
    /// In [0, 1], rounded to 4 decimal places.
    pub confidence_score: f64,
    /// Raw (unnormalized) feature snapshot used for the prediction.
    pub factors: serde_json::Value,
    /// Tag of the estimator that produced this ("ridge",
    /// "regression_tree", "gradient_boost", or "fallback").
    pub model_used: String,
    pub prediction_date: DateTime<Utc>,
    /// Estimated date the cost will be incurred.
    pub target_date: NaiveDate,
    pub actual_amount: Option<Decimal>,
    /// Absolute percentage error, once the actual amount is known.
    pub prediction_error: Option<f64>,
}

impl Prediction {
    /// Absolute percentage error against an actual amount, if computable.
    pub fn error_against(&self, actual: Decimal) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;

        if actual <= Decimal::ZERO {
            return None;
        }
        let predicted = self.predicted_amount.to_f64()?;
        let actual = actual.to_f64()?;
        Some((predicted - actual).abs() / actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prediction(amount: Decimal) -> Prediction {
        Prediction {
            id: Uuid::new_v4(),
            operation_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            predicted_amount: amount,
            confidence_score: 0.5,
            factors: serde_json::json!({}),
            model_used: "ridge".into(),
            prediction_date: Utc::now(),
            target_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            actual_amount: None,
            prediction_error: None,
        }
    }

    #[test]
    fn error_against_actual() {
        let p = prediction(dec!(120));
        let err = p.error_against(dec!(100)).unwrap();
        assert!((err - 0.2).abs() < 1e-9);
    }

    #[test]
    fn error_undefined_for_nonpositive_actual() {
        let p = prediction(dec!(120));
        assert_eq!(p.error_against(dec!(0)), None);
        assert_eq!(p.error_against(dec!(-5)), None);
    }
}
