//! Industry-standard fallback estimation.
//!
//! When training or prediction is infeasible for a category, the engine
//! degrades to a rule-based estimate: a per-type base cost per acre from a
//! fixed industry table, scaled by commodity price, expected yield, and
//! region. No ML involved; confidence is pinned low.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::domain::{CostCategory, FarmingOperation, OperationType};
use crate::error::PredictionError;

/// Method tag distinguishing fallback output from ML output.
pub const FALLBACK_METHOD: &str = "industry_standards";

/// Fixed confidence for any fallback estimate, regardless of adjustments.
pub const FALLBACK_CONFIDENCE: f64 = 0.3;

/// Industry base cost per acre for crop operations.
const CROPS_BASE: &[(&str, f64)] = &[
    ("Seeds/Seedlings", 120.0),
    ("Fertilizers", 180.0),
    ("Pesticides", 85.0),
    ("Fuel", 95.0),
    ("Seasonal Labor", 75.0),
    ("Equipment Repairs", 65.0),
    ("Transportation", 35.0),
    ("Water/Irrigation", 45.0),
    ("Land Rent/Mortgage", 200.0),
    ("Property Taxes", 25.0),
    ("Equipment Depreciation", 150.0),
    ("Insurance", 40.0),
    ("Permanent Labor", 90.0),
];

/// Livestock operations. Seeds are not applicable; fertilizer covers
/// pasture only.
const LIVESTOCK_BASE: &[(&str, f64)] = &[
    ("Seeds/Seedlings", 0.0),
    ("Fertilizers", 25.0),
    ("Pesticides", 15.0),
    ("Fuel", 85.0),
    ("Seasonal Labor", 55.0),
    ("Equipment Repairs", 75.0),
    ("Transportation", 45.0),
    ("Water/Irrigation", 65.0),
    ("Land Rent/Mortgage", 150.0),
    ("Property Taxes", 20.0),
    ("Equipment Depreciation", 120.0),
    ("Insurance", 55.0),
    ("Permanent Labor", 180.0),
];

const MIXED_BASE: &[(&str, f64)] = &[
    ("Seeds/Seedlings", 60.0),
    ("Fertilizers", 100.0),
    ("Pesticides", 50.0),
    ("Fuel", 90.0),
    ("Seasonal Labor", 65.0),
    ("Equipment Repairs", 70.0),
    ("Transportation", 40.0),
    ("Water/Irrigation", 55.0),
    ("Land Rent/Mortgage", 175.0),
    ("Property Taxes", 22.0),
    ("Equipment Depreciation", 135.0),
    ("Insurance", 48.0),
    ("Permanent Labor", 135.0),
];

/// Regional cost multipliers relative to baseline, matched as
/// case-insensitive substrings of the operation location. First hit wins.
const REGIONAL_MULTIPLIERS: &[(&str, f64)] = &[
    ("western province", 1.20),
    ("colombo", 1.25),
    ("gampaha", 1.15),
    ("kandy", 1.10),
    ("central province", 1.10),
    ("southern province", 1.05),
    ("galle", 1.08),
    ("matara", 1.04),
    ("nuwara eliya", 1.00),
    ("northern province", 0.95),
    ("jaffna", 0.92),
    ("eastern province", 0.94),
    ("batticaloa", 0.93),
    ("uva province", 0.90),
    ("monaragala", 0.88),
    ("sabaragamuwa province", 0.92),
    ("ratnapura", 0.91),
    ("north central province", 0.89),
    ("anuradhapura", 0.90),
    ("north western province", 0.93),
    ("kurunegala", 0.94),
];

/// A rule-based estimate. Persistence is the batch orchestrator's job, not
/// this component's.
#[derive(Debug, Clone)]
pub struct FallbackEstimate {
    pub predicted_amount: Decimal,
    pub confidence_score: f64,
    pub prediction_method: &'static str,
    pub base_amount_per_acre: f64,
    /// Which adjustments applied, persisted as the factor snapshot.
    pub factors: serde_json::Value,
}

/// Estimate a category's cost from industry standards.
pub fn estimate(
    operation: &FarmingOperation,
    category: &CostCategory,
) -> Result<FallbackEstimate, PredictionError> {
    let base = base_per_acre(operation.operation_type, &category.name);
    if base == 0.0 {
        return Err(PredictionError::NoFallbackAvailable {
            category: category.name.clone(),
        });
    }

    let acres = operation.total_acres.to_f64().unwrap_or(0.0);
    let mut amount = base * acres;

    if let Some(price) = operation.commodity_price.and_then(|p| p.to_f64()) {
        amount *= price_multiplier(price, operation.operation_type);
    }

    if let Some(expected_yield) = operation.expected_yield.and_then(|y| y.to_f64()) {
        if acres > 0.0 {
            amount *= yield_multiplier(expected_yield / acres, operation.operation_type);
        }
    }

    if let Some(location) = operation.location.as_deref() {
        amount *= regional_multiplier(location);
    }

    let factors = serde_json::json!({
        "acres": acres,
        "operation_type": operation.operation_type.as_str(),
        "base_amount_per_acre": base,
        "commodity_price_adjustment": operation.commodity_price.is_some(),
        "yield_adjustment": operation.expected_yield.is_some(),
        "regional_adjustment": operation.location.is_some(),
    });

    Ok(FallbackEstimate {
        predicted_amount: Decimal::from_f64(amount)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2),
        confidence_score: FALLBACK_CONFIDENCE,
        prediction_method: FALLBACK_METHOD,
        base_amount_per_acre: base,
        factors,
    })
}

fn base_per_acre(operation_type: OperationType, category_name: &str) -> f64 {
    let table = match operation_type {
        OperationType::Crops => CROPS_BASE,
        OperationType::Livestock => LIVESTOCK_BASE,
        OperationType::Mixed => MIXED_BASE,
    };
    table
        .iter()
        .find(|(name, _)| *name == category_name)
        .map(|(_, base)| *base)
        .unwrap_or(0.0)
}

/// Commodity price relative to the type's industry average, clamped to
/// [0.7, 1.5].
pub fn price_multiplier(commodity_price: f64, operation_type: OperationType) -> f64 {
    let avg = match operation_type {
        OperationType::Crops => 5.50,
        OperationType::Livestock => 1400.0,
        OperationType::Mixed => 8.00,
    };
    (commodity_price / avg).clamp(0.7, 1.5)
}

/// Per-acre yield relative to the type's industry average, clamped to
/// [0.8, 1.3].
pub fn yield_multiplier(yield_per_acre: f64, operation_type: OperationType) -> f64 {
    let avg = match operation_type {
        OperationType::Crops => 175.0,
        OperationType::Livestock => 2.0,
        OperationType::Mixed => 100.0,
    };
    (yield_per_acre / avg).clamp(0.8, 1.3)
}

/// Regional adjustment from the province table; 1.0 when nothing matches.
pub fn regional_multiplier(location: &str) -> f64 {
    let location = location.to_lowercase();
    REGIONAL_MULTIPLIERS
        .iter()
        .find(|(region, _)| location.contains(region))
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}
