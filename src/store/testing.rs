//! In-memory [`CostStore`] used by service and CLI tests, mirroring the
//! Postgres filters.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{CostCategory, CostRecord, FarmingOperation, OperationType, Prediction};
use crate::error::DatabaseError;
use crate::store::{CategoryAccuracy, CostStore, TrainingRow};

#[derive(Default)]
pub(crate) struct MockStore {
    pub(crate) operations: Mutex<Vec<FarmingOperation>>,
    pub(crate) categories: Mutex<Vec<CostCategory>>,
    pub(crate) costs: Mutex<Vec<(CostRecord, FarmingOperation)>>,
    pub(crate) predictions: Mutex<HashMap<(Uuid, Uuid, NaiveDate), Prediction>>,
    pub(crate) fail_atomic_upserts: Mutex<bool>,
}

impl MockStore {
    pub(crate) fn add_operation(&self, op: FarmingOperation) {
        self.operations.lock().unwrap().push(op);
    }

    pub(crate) fn add_category(&self, cat: CostCategory) {
        self.categories.lock().unwrap().push(cat);
    }

    pub(crate) fn add_cost(&self, record: CostRecord, operation: FarmingOperation) {
        self.costs.lock().unwrap().push((record, operation));
    }

    pub(crate) fn prediction_count(&self) -> usize {
        self.predictions.lock().unwrap().len()
    }
}

pub(crate) fn crops_operation(acres: Decimal) -> FarmingOperation {
    use chrono::Utc;

    FarmingOperation {
        id: Uuid::new_v4(),
        name: "Current season".into(),
        operation_type: OperationType::Crops,
        total_acres: acres,
        season_start: Utc::now().date_naive(),
        season_end: Utc::now().date_naive() + chrono::Days::new(200),
        expected_yield: None,
        yield_unit: None,
        commodity_price: None,
        location: None,
        weather: None,
    }
}

pub(crate) fn finished_operation(acres: Decimal) -> FarmingOperation {
    use chrono::Utc;

    let mut op = crops_operation(acres);
    op.name = "Past season".into();
    op.season_start = Utc::now().date_naive() - chrono::Days::new(400);
    op.season_end = Utc::now().date_naive() - chrono::Days::new(200);
    op
}

pub(crate) fn category(name: &str, cost_class: crate::domain::CostClass) -> CostCategory {
    CostCategory {
        id: Uuid::new_v4(),
        name: name.into(),
        cost_class,
        is_predictable: true,
        typical_percentage: None,
    }
}

pub(crate) fn cost(
    category_id: Uuid,
    operation: &FarmingOperation,
    amount: Decimal,
) -> CostRecord {
    CostRecord {
        id: Uuid::new_v4(),
        operation_id: operation.id,
        category_id,
        amount,
        incurred_date: operation.season_start + chrono::Days::new(30),
        quantity: None,
        unit: None,
        unit_price: None,
        external_factors: None,
    }
}

/// Seed `n` finished-season costs for one category.
pub(crate) fn seed_history(store: &MockStore, category_id: Uuid, n: usize) {
    for i in 0..n {
        let op = finished_operation(Decimal::from(50 + (i % 5) as i64));
        let amount = Decimal::from(900 + (i % 7) as i64 * 10);
        store.add_cost(cost(category_id, &op, amount), op);
    }
}

#[async_trait]
impl CostStore for MockStore {
    async fn get_operation(&self, id: Uuid) -> Result<Option<FarmingOperation>, DatabaseError> {
        Ok(self
            .operations
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<CostCategory>, DatabaseError> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn list_operations(&self) -> Result<Vec<FarmingOperation>, DatabaseError> {
        Ok(self.operations.lock().unwrap().clone())
    }

    async fn list_predictable_categories(&self) -> Result<Vec<CostCategory>, DatabaseError> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_predictable)
            .cloned()
            .collect())
    }

    async fn training_rows(
        &self,
        category_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<TrainingRow>, DatabaseError> {
        Ok(self
            .costs
            .lock()
            .unwrap()
            .iter()
            .filter(|(record, op)| {
                record.category_id == category_id
                    && record.amount > Decimal::ZERO
                    && op.season_end < as_of
                    && op.total_acres > Decimal::ZERO
            })
            .map(|(record, operation)| TrainingRow {
                record: record.clone(),
                operation: operation.clone(),
            })
            .collect())
    }

    async fn mean_amount_for_type(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
    ) -> Result<Option<Decimal>, DatabaseError> {
        let costs = self.costs.lock().unwrap();
        let amounts: Vec<Decimal> = costs
            .iter()
            .filter(|(r, o)| r.category_id == category_id && o.operation_type == operation_type)
            .map(|(r, _)| r.amount)
            .collect();
        if amounts.is_empty() {
            return Ok(None);
        }
        let sum: Decimal = amounts.iter().sum();
        Ok(Some(sum / Decimal::from(amounts.len())))
    }

    async fn comparable_amounts(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
        acres_low: Decimal,
        acres_high: Decimal,
        since: NaiveDate,
    ) -> Result<Vec<Decimal>, DatabaseError> {
        Ok(self
            .costs
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, o)| {
                r.category_id == category_id
                    && o.operation_type == operation_type
                    && o.total_acres >= acres_low
                    && o.total_acres <= acres_high
                    && r.incurred_date >= since
            })
            .map(|(r, _)| r.amount)
            .collect())
    }

    async fn count_cost_records(&self) -> Result<i64, DatabaseError> {
        Ok(self.costs.lock().unwrap().len() as i64)
    }

    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), DatabaseError> {
        let key = (
            prediction.operation_id,
            prediction.category_id,
            prediction.target_date,
        );
        self.predictions
            .lock()
            .unwrap()
            .insert(key, prediction.clone());
        Ok(())
    }

    async fn upsert_predictions_atomic(
        &self,
        predictions: &[Prediction],
    ) -> Result<(), DatabaseError> {
        if *self.fail_atomic_upserts.lock().unwrap() {
            return Err(DatabaseError::Pool("simulated outage".into()));
        }
        for p in predictions {
            self.upsert_prediction(p).await?;
        }
        Ok(())
    }

    async fn record_actual_amount(
        &self,
        prediction_id: Uuid,
        actual: Decimal,
        error: Option<f64>,
    ) -> Result<(), DatabaseError> {
        let mut predictions = self.predictions.lock().unwrap();
        for p in predictions.values_mut() {
            if p.id == prediction_id {
                p.actual_amount = Some(actual);
                p.prediction_error = error;
            }
        }
        Ok(())
    }

    async fn prediction_accuracy_stats(&self) -> Result<Vec<CategoryAccuracy>, DatabaseError> {
        Ok(Vec::new())
    }
}
