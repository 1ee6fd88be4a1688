//! Heuristic confidence scoring for predictions.
//!
//! Confidence comes from how far the prediction sits from historical
//! amounts of comparable operations (same type, acreage within ±30%,
//! last 3 years), expressed as a z-score against the comparable
//! population.

/// Comparable pool too small to say anything: low-data default.
const LOW_DATA_CONFIDENCE: f64 = 0.3;
const MIN_COMPARABLES: usize = 3;

/// Score a prediction against comparable historical amounts.
///
/// `model_reliable` is the cached trained-model reliability flag; an
/// unreliable model scales the z-score-derived confidence down by 0.7.
pub fn score(prediction: f64, comparables: &[f64], model_reliable: bool) -> f64 {
    if comparables.len() < MIN_COMPARABLES {
        return LOW_DATA_CONFIDENCE;
    }

    let mean = comparables.iter().sum::<f64>() / comparables.len() as f64;
    let std = population_std(comparables, mean);

    if std == 0.0 {
        return if prediction == mean { 0.95 } else { 0.5 };
    }

    let z = (prediction - mean).abs() / std;
    let mut confidence = (1.0 - z / 4.0).clamp(0.1, 0.95);

    if !model_reliable {
        confidence *= 0.7;
    }

    round4(confidence)
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_data_default() {
        assert_eq!(score(1000.0, &[], true), 0.3);
        assert_eq!(score(1000.0, &[900.0, 1100.0], true), 0.3);
    }

    #[test]
    fn zero_std_exact_match() {
        let comparables = [1000.0, 1000.0, 1000.0];
        assert_eq!(score(1000.0, &comparables, true), 0.95);
        assert_eq!(score(1200.0, &comparables, true), 0.5);
    }

    #[test]
    fn prediction_at_the_mean_is_most_confident() {
        let comparables = [800.0, 1000.0, 1200.0];
        let at_mean = score(1000.0, &comparables, true);
        let far_off = score(2000.0, &comparables, true);
        assert_eq!(at_mean, 0.95);
        assert!(far_off < at_mean);
    }

    #[test]
    fn z_score_path_stays_in_bounds() {
        let comparables = [500.0, 900.0, 1300.0, 1700.0];
        for prediction in [0.0, 500.0, 1100.0, 5000.0, 100_000.0] {
            let c = score(prediction, &comparables, true);
            assert!((0.1..=0.95).contains(&c), "confidence {c} out of range");
        }
    }

    #[test]
    fn unreliable_model_scales_down() {
        let comparables = [800.0, 1000.0, 1200.0];
        let reliable = score(1050.0, &comparables, true);
        let unreliable = score(1050.0, &comparables, false);
        assert!((unreliable - reliable * 0.7).abs() < 1e-4);
    }

    #[test]
    fn rounding_to_four_places() {
        let comparables = [800.0, 1000.0, 1200.0];
        let c = score(1234.5, &comparables, true);
        assert_eq!(c, (c * 10_000.0).round() / 10_000.0);
    }
}
