//! Feature construction for cost models.
//!
//! Every model sees the same fixed-order numeric vector. Missing inputs get
//! documented defaults and non-finite values are coerced to zero so
//! training stays numerically stable.

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::{CostRecord, FarmingOperation, OperationType};

/// Number of features in the vector.
pub const FIELD_COUNT: usize = 15;

/// Field names, in vector order. Also the keys of the persisted factor
/// snapshot.
pub const FIELD_NAMES: [&str; FIELD_COUNT] = [
    "acres",
    "season_length_days",
    "season_start_month",
    "expected_yield",
    "commodity_price",
    "type_crops",
    "type_livestock",
    "type_mixed",
    "avg_temperature",
    "total_rainfall",
    "frost_days",
    "historical_category_avg",
    "fuel_price",
    "labor_rate",
    "input_price_index",
];

const IDX_ACRES: usize = 0;
const IDX_COMMODITY_PRICE: usize = 4;
const IDX_HISTORICAL_AVG: usize = 11;

const DEFAULT_AVG_TEMPERATURE: f64 = 20.0;
const DEFAULT_TOTAL_RAINFALL: f64 = 500.0;
const DEFAULT_FROST_DAYS: f64 = 0.0;
const DEFAULT_FUEL_PRICE: f64 = 3.0;
const DEFAULT_LABOR_RATE: f64 = 15.0;
const DEFAULT_INPUT_PRICE_INDEX: f64 = 100.0;

/// A fixed-order numeric feature vector for one (operation, category) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FIELD_COUNT],
}

impl FeatureVector {
    /// Build features for an operation.
    ///
    /// `historical_avg` is the cache-backed mean historical amount for the
    /// category over operations of the same type. `record` is the specific
    /// cost record when building a training row; its external factors feed
    /// the market-condition fields.
    pub fn extract(
        operation: &FarmingOperation,
        historical_avg: f64,
        record: Option<&CostRecord>,
    ) -> Self {
        let weather = operation.weather.as_ref();
        let external = record.and_then(|r| r.external_factors.as_ref());

        let mut values = [0.0; FIELD_COUNT];
        values[IDX_ACRES] = operation.total_acres.to_f64().unwrap_or(0.0);
        values[1] = operation.season_length_days() as f64;
        values[2] = operation.season_start.month() as f64;
        values[3] = operation
            .expected_yield
            .and_then(|y| y.to_f64())
            .unwrap_or(0.0);
        values[IDX_COMMODITY_PRICE] = operation
            .commodity_price
            .and_then(|p| p.to_f64())
            .unwrap_or(0.0);
        values[5] = f64::from(operation.operation_type == OperationType::Crops);
        values[6] = f64::from(operation.operation_type == OperationType::Livestock);
        values[7] = f64::from(operation.operation_type == OperationType::Mixed);
        values[8] = weather
            .and_then(|w| w.avg_temperature)
            .unwrap_or(DEFAULT_AVG_TEMPERATURE);
        values[9] = weather
            .and_then(|w| w.total_rainfall)
            .unwrap_or(DEFAULT_TOTAL_RAINFALL);
        values[10] = weather
            .and_then(|w| w.frost_days)
            .unwrap_or(DEFAULT_FROST_DAYS);
        values[IDX_HISTORICAL_AVG] = historical_avg;
        values[12] = external
            .and_then(|e| e.fuel_price)
            .unwrap_or(DEFAULT_FUEL_PRICE);
        values[13] = external
            .and_then(|e| e.labor_rate)
            .unwrap_or(DEFAULT_LABOR_RATE);
        values[14] = external
            .and_then(|e| e.input_price_index)
            .unwrap_or(DEFAULT_INPUT_PRICE_INDEX);

        // Mandatory sanitation: anything non-finite becomes 0.0.
        for v in &mut values {
            if !v.is_finite() {
                *v = 0.0;
            }
        }

        Self { values }
    }

    /// A feature set is usable only if more than 5 fields are populated and
    /// every value is finite.
    pub fn is_valid(&self) -> bool {
        let populated = self.values.iter().filter(|v| **v != 0.0).count();
        populated > 5 && self.values.iter().all(|v| v.is_finite())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Fixed per-field scaling applied on the prediction path: acres / 10,
    /// commodity price / 100, historical category average / 1000.
    pub fn normalized(&self) -> [f64; FIELD_COUNT] {
        let mut out = self.values;
        out[IDX_ACRES] /= 10.0;
        out[IDX_COMMODITY_PRICE] /= 100.0;
        out[IDX_HISTORICAL_AVG] /= 1000.0;
        out
    }

    pub fn historical_avg(&self) -> f64 {
        self.values[IDX_HISTORICAL_AVG]
    }

    /// Name → raw value map, persisted as the prediction's factor snapshot.
    pub fn to_snapshot(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = FIELD_NAMES
            .iter()
            .zip(self.values.iter())
            .map(|(name, value)| ((*name).to_string(), serde_json::json!(value)))
            .collect();
        serde_json::Value::Object(map)
    }
}
