//! Historical cost records, the training input.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Market conditions captured alongside a cost record.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExternalFactors {
    pub fuel_price: Option<f64>,
    pub labor_rate: Option<f64>,
    pub input_price_index: Option<f64>,
}

/// One incurred cost, belonging to an operation and a category.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CostRecord {
    pub id: Uuid,
    pub operation_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub incurred_date: NaiveDate,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub external_factors: Option<ExternalFactors>,
}
