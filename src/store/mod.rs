//! Persistence contract for the prediction engine.
//!
//! The engine only ever talks to [`CostStore`]; [`PgStore`] is the
//! Postgres implementation. Tests swap in an in-memory mock.

mod postgres;
#[cfg(test)]
pub(crate) mod testing;

pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{CostCategory, CostRecord, FarmingOperation, OperationType, Prediction};
use crate::error::DatabaseError;

/// One joined training input: a historical cost and its owning operation.
#[derive(Debug, Clone)]
pub struct TrainingRow {
    pub record: CostRecord,
    pub operation: FarmingOperation,
}

/// Accuracy aggregate for predictions with known actuals, per category.
#[derive(Debug, Clone)]
pub struct CategoryAccuracy {
    pub category_id: Uuid,
    pub category_name: String,
    pub prediction_count: i64,
    pub avg_error: Option<f64>,
    pub min_error: Option<f64>,
    pub max_error: Option<f64>,
    pub avg_confidence: Option<f64>,
}

/// Read/write access the prediction engine requires from storage.
#[async_trait]
pub trait CostStore: Send + Sync {
    async fn get_operation(&self, id: Uuid) -> Result<Option<FarmingOperation>, DatabaseError>;

    async fn get_category(&self, id: Uuid) -> Result<Option<CostCategory>, DatabaseError>;

    async fn list_operations(&self) -> Result<Vec<FarmingOperation>, DatabaseError>;

    /// Categories flagged suitable for model-based prediction.
    async fn list_predictable_categories(&self) -> Result<Vec<CostCategory>, DatabaseError>;

    /// Valid training inputs for a category: amount > 0, owning operation
    /// ended before `as_of` with positive acreage, ordered by incurred
    /// date.
    async fn training_rows(
        &self,
        category_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<TrainingRow>, DatabaseError>;

    /// Mean historical amount for a category over operations of one type.
    async fn mean_amount_for_type(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
    ) -> Result<Option<Decimal>, DatabaseError>;

    /// Historical amounts for comparable operations: same category and
    /// type, acreage within the band, incurred on or after `since`.
    async fn comparable_amounts(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
        acres_low: Decimal,
        acres_high: Decimal,
        since: NaiveDate,
    ) -> Result<Vec<Decimal>, DatabaseError>;

    /// Total historical cost records across all categories.
    async fn count_cost_records(&self) -> Result<i64, DatabaseError>;

    /// Upsert one prediction by (operation, category, target date).
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), DatabaseError>;

    /// Upsert a whole batch in a single all-or-nothing transaction. A
    /// failure on any row rolls back every row.
    async fn upsert_predictions_atomic(
        &self,
        predictions: &[Prediction],
    ) -> Result<(), DatabaseError>;

    /// Record the ground-truth amount and computed error for a prediction.
    async fn record_actual_amount(
        &self,
        prediction_id: Uuid,
        actual: Decimal,
        error: Option<f64>,
    ) -> Result<(), DatabaseError>;

    /// Per-category accuracy aggregates over predictions with actuals.
    async fn prediction_accuracy_stats(&self) -> Result<Vec<CategoryAccuracy>, DatabaseError>;
}
