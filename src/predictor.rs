//! The prediction service: training, single predictions, and the batch
//! orchestrator.
//!
//! ML first, industry-standard fallback second, per-category error
//! isolation third: one category's failure never aborts a batch. All rows
//! persisted for a batch go through one all-or-nothing transaction.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::confidence;
use crate::dataset;
use crate::domain::{CostCategory, FarmingOperation, Prediction};
use crate::error::PredictionError;
use crate::fallback;
use crate::features::FeatureVector;
use crate::model::{CostModel, ModelKind, ModelRegistry};
use crate::store::CostStore;
use crate::timing;
use crate::validation::{self, ModelPerformance};

/// Comparable acreage band for confidence scoring: ±30%.
const COMPARABLE_ACRES_BAND: f64 = 0.3;
/// Comparables must have been incurred within the last 3 years.
const COMPARABLE_WINDOW_MONTHS: u32 = 36;

/// Result of a single-category prediction, ML or fallback.
#[derive(Debug, Clone)]
pub struct CategoryPrediction {
    pub prediction_id: Uuid,
    pub category_id: Uuid,
    pub category_name: String,
    pub predicted_amount: Decimal,
    pub confidence_score: f64,
    /// "ridge" / "regression_tree" / "gradient_boost", or "fallback".
    pub model_used: String,
    /// "ml" or "industry_standards".
    pub prediction_method: &'static str,
    pub sample_count: usize,
    pub target_date: NaiveDate,
    pub factors: serde_json::Value,
}

/// Aggregate of a full batch run over one operation.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successful predictions keyed by category name.
    pub predictions: HashMap<String, CategoryPrediction>,
    pub total_predicted_cost: Decimal,
    pub predicted_cost_per_acre: Decimal,
    pub prediction_date: DateTime<Utc>,
    pub categories_processed: usize,
    pub categories_failed: usize,
    /// processed / (processed + failed) × 100, one decimal place.
    pub success_rate: f64,
    /// Original ML error message per failed category.
    pub errors: HashMap<String, String>,
    pub data_status: DataStatus,
}

/// Context about how much data backed a batch.
#[derive(Debug, Clone)]
pub struct DataStatus {
    pub historical_costs_available: i64,
    pub fallback_used: bool,
    pub models_trained: usize,
}

/// Cost prediction engine.
///
/// Holds the model registry and the two TTL caches; the store is the only
/// external collaborator.
pub struct PredictionService {
    store: Arc<dyn CostStore>,
    config: EngineConfig,
    registry: RwLock<ModelRegistry>,
    performance_cache: TtlCache<ModelPerformance>,
    avg_cache: TtlCache<f64>,
}

impl PredictionService {
    pub fn new(store: Arc<dyn CostStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            registry: RwLock::new(ModelRegistry::new()),
            performance_cache: TtlCache::new(),
            avg_cache: TtlCache::new(),
        }
    }

    /// Cached validation record for a category's trained model, if live.
    pub fn cached_performance(&self, category_id: Uuid) -> Option<ModelPerformance> {
        self.performance_cache.get(&performance_key(category_id))
    }

    /// Train (or return the cached performance of) the model for a
    /// category, resolving the id at the boundary.
    pub async fn train_model_for_category(
        &self,
        category_id: Uuid,
    ) -> Result<ModelPerformance, PredictionError> {
        let category = self
            .store
            .get_category(category_id)
            .await?
            .ok_or_else(|| {
                PredictionError::InvalidArgument(format!(
                    "Cost category with id {category_id} not found"
                ))
            })?;
        self.train_category(&category).await
    }

    /// Predict one category's cost for one operation and persist the
    /// resulting record.
    pub async fn predict_cost_for_operation(
        &self,
        operation_id: Uuid,
        category_id: Uuid,
    ) -> Result<CategoryPrediction, PredictionError> {
        let operation = self.resolve_operation(operation_id).await?;
        let category = self
            .store
            .get_category(category_id)
            .await?
            .ok_or_else(|| {
                PredictionError::InvalidArgument(format!(
                    "Cost category with id {category_id} not found"
                ))
            })?;

        let (row, result) = self.predict_category(&operation, &category).await?;
        self.store.upsert_prediction(&row).await?;
        tracing::info!(
            operation = %operation.name,
            category = %category.name,
            amount = %result.predicted_amount,
            confidence = result.confidence_score,
            model = %result.model_used,
            "prediction saved"
        );
        Ok(result)
    }

    /// Predict every predictable category for an operation, falling back
    /// to industry standards per category when ML fails, and persist all
    /// surviving rows in one transaction.
    pub async fn predict_all_costs_for_operation(
        &self,
        operation_id: Uuid,
    ) -> Result<BatchOutcome, PredictionError> {
        let operation = self.resolve_operation(operation_id).await?;
        validate_operation(&operation)?;

        let categories = self.store.list_predictable_categories().await?;
        if categories.is_empty() {
            return Err(PredictionError::InvalidArgument(
                "No predictable cost categories found".into(),
            ));
        }

        let historical_costs_available = self.store.count_cost_records().await?;

        let mut predictions = HashMap::new();
        let mut rows: Vec<Prediction> = Vec::new();
        let mut errors = HashMap::new();
        let mut total = Decimal::ZERO;
        let mut fallback_used = false;

        for category in &categories {
            match self.predict_category(&operation, category).await {
                Ok((row, result)) => {
                    total += result.predicted_amount;
                    rows.push(row);
                    predictions.insert(category.name.clone(), result);
                }
                Err(ml_error) => match fallback::estimate(&operation, category) {
                    Ok(estimate) => {
                        fallback_used = true;
                        let (row, result) =
                            self.fallback_row(&operation, category, &estimate);
                        total += result.predicted_amount;
                        // Policy knob: tiny fallback rows are reported but
                        // not persisted.
                        if row.predicted_amount > self.config.min_persist_amount {
                            rows.push(row);
                        }
                        predictions.insert(category.name.clone(), result);
                        tracing::info!(
                            category = %category.name,
                            ml_error = %ml_error,
                            "ML prediction unavailable, used industry standards"
                        );
                    }
                    Err(fallback_error) => {
                        tracing::warn!(
                            category = %category.name,
                            ml_error = %ml_error,
                            fallback_error = %fallback_error,
                            "both ML and fallback prediction failed"
                        );
                        // The errors map carries the original ML failure.
                        errors.insert(category.name.clone(), ml_error.to_string());
                    }
                },
            }
        }

        // Whole-batch transaction: a storage failure here drops every row.
        self.store.upsert_predictions_atomic(&rows).await?;

        let processed = predictions.len();
        let failed = errors.len();
        let success_rate = if processed + failed > 0 {
            round1(processed as f64 / (processed + failed) as f64 * 100.0)
        } else {
            0.0
        };
        let predicted_cost_per_acre = if operation.total_acres > Decimal::ZERO {
            (total / operation.total_acres).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let models_trained = self.registry.read().expect("registry lock poisoned").len();
        tracing::info!(
            operation = %operation.name,
            total = %total,
            processed,
            failed,
            fallback_used,
            "batch prediction complete"
        );

        Ok(BatchOutcome {
            predictions,
            total_predicted_cost: total.round_dp(2),
            predicted_cost_per_acre,
            prediction_date: Utc::now(),
            categories_processed: processed,
            categories_failed: failed,
            success_rate,
            errors,
            data_status: DataStatus {
                historical_costs_available,
                fallback_used,
                models_trained,
            },
        })
    }

    /// Record the ground-truth amount for a persisted prediction and its
    /// absolute percentage error.
    pub async fn record_actual_amount(
        &self,
        prediction: &Prediction,
        actual: Decimal,
    ) -> Result<(), PredictionError> {
        let error = prediction.error_against(actual);
        if let Some(err) = error {
            if err > self.config.max_prediction_variance {
                tracing::warn!(
                    prediction_id = %prediction.id,
                    category_id = %prediction.category_id,
                    predicted = %prediction.predicted_amount,
                    actual = %actual,
                    error_rate = err,
                    "high prediction error detected"
                );
            }
        }
        self.store
            .record_actual_amount(prediction.id, actual, error)
            .await?;
        Ok(())
    }

    async fn resolve_operation(
        &self,
        operation_id: Uuid,
    ) -> Result<FarmingOperation, PredictionError> {
        self.store
            .get_operation(operation_id)
            .await?
            .ok_or_else(|| {
                PredictionError::InvalidArgument(format!(
                    "Farming operation with id {operation_id} not found"
                ))
            })
    }

    /// Fit and validate a category's model, memoizing the performance
    /// record. Never caches anything when preparation fails.
    async fn train_category(
        &self,
        category: &CostCategory,
    ) -> Result<ModelPerformance, PredictionError> {
        let key = performance_key(category.id);
        if let Some(cached) = self.performance_cache.get(&key) {
            // Only short-circuit when the fitted model is still resident;
            // a fresh process may hold a live cache entry but no model.
            if self
                .registry
                .read()
                .expect("registry lock poisoned")
                .contains(&category.id)
            {
                return Ok(cached);
            }
        }

        tracing::info!(category = %category.name, "starting model training");

        let data = dataset::prepare(
            self.store.as_ref(),
            &self.avg_cache,
            self.config.cache_ttl,
            category,
            self.config.min_training_samples,
            Utc::now().date_naive(),
        )
        .await?;

        let kind = ModelKind::for_sample_count(data.sample_count());
        let mut model = CostModel::new(kind);
        model.fit(&data.samples, &data.labels);

        let in_sample: Vec<f64> = data.samples.iter().map(|s| model.predict(s)).collect();
        let performance = validation::validate(model.id(), &in_sample, &data.labels);

        tracing::info!(
            category = %category.name,
            model = model.id(),
            mape = performance.mape,
            samples = performance.sample_count,
            reliability = performance.reliability.as_str(),
            "model training complete"
        );

        self.registry
            .write()
            .expect("registry lock poisoned")
            .insert(category.id, model);
        self.performance_cache
            .put(key, performance.clone(), self.config.cache_ttl);

        Ok(performance)
    }

    /// ML prediction for one category. Returns the persistable row and the
    /// caller-facing result; persistence stays with the caller.
    async fn predict_category(
        &self,
        operation: &FarmingOperation,
        category: &CostCategory,
    ) -> Result<(Prediction, CategoryPrediction), PredictionError> {
        let avg = dataset::historical_avg(
            self.store.as_ref(),
            &self.avg_cache,
            self.config.cache_ttl,
            category.id,
            operation.operation_type,
        )
        .await?;
        let features = FeatureVector::extract(operation, avg, None);

        let needs_training = !self
            .registry
            .read()
            .expect("registry lock poisoned")
            .contains(&category.id);
        if needs_training {
            self.train_category(category).await?;
        }

        let normalized = features.normalized();
        let (raw_prediction, model_id) = {
            let registry = self.registry.read().expect("registry lock poisoned");
            let model = registry.get(&category.id).ok_or_else(|| {
                PredictionError::TrainingFailed {
                    category: category.name.clone(),
                    reason: "model missing after training".into(),
                }
            })?;
            (model.predict(&normalized), model.id())
        };
        let predicted = raw_prediction.max(0.0);

        let confidence = self.confidence_for(operation, category, predicted).await?;
        self.check_variance(category, predicted, features.historical_avg());

        let performance = self.cached_performance(category.id);
        let sample_count = performance.map(|p| p.sample_count).unwrap_or(0);

        let target_date = timing::estimate_target_date(operation, category);
        let row = Prediction {
            id: Uuid::new_v4(),
            operation_id: operation.id,
            category_id: category.id,
            predicted_amount: Decimal::from_f64(predicted)
                .unwrap_or(Decimal::ZERO)
                .round_dp(2),
            confidence_score: confidence,
            factors: features.to_snapshot(),
            model_used: model_id.to_string(),
            prediction_date: Utc::now(),
            target_date,
            actual_amount: None,
            prediction_error: None,
        };

        let result = CategoryPrediction {
            prediction_id: row.id,
            category_id: category.id,
            category_name: category.name.clone(),
            predicted_amount: row.predicted_amount,
            confidence_score: confidence,
            model_used: row.model_used.clone(),
            prediction_method: "ml",
            sample_count,
            target_date,
            factors: row.factors.clone(),
        };
        Ok((row, result))
    }

    /// Confidence from comparable operations' historical amounts.
    async fn confidence_for(
        &self,
        operation: &FarmingOperation,
        category: &CostCategory,
        predicted: f64,
    ) -> Result<f64, PredictionError> {
        let band = Decimal::from_f64(COMPARABLE_ACRES_BAND).unwrap_or_default();
        let low = std::cmp::max(
            Decimal::ONE,
            operation.total_acres * (Decimal::ONE - band),
        );
        let high = operation.total_acres * (Decimal::ONE + band);
        let since = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(COMPARABLE_WINDOW_MONTHS))
            .unwrap_or(NaiveDate::MIN);

        let comparables: Vec<f64> = self
            .store
            .comparable_amounts(category.id, operation.operation_type, low, high, since)
            .await?
            .iter()
            .filter_map(|d| d.to_f64())
            .collect();

        let reliable = self
            .cached_performance(category.id)
            .map(|p| p.is_reliable)
            .unwrap_or(false);

        Ok(confidence::score(predicted, &comparables, reliable))
    }

    /// Informational variance check against the historical average. Warns,
    /// never blocks.
    fn check_variance(&self, category: &CostCategory, predicted: f64, historical_avg: f64) {
        if historical_avg == 0.0 {
            return;
        }
        let variance = ((predicted - historical_avg) / historical_avg).abs();
        if variance > self.config.max_prediction_variance {
            tracing::warn!(
                category = %category.name,
                predicted,
                historical_avg,
                variance,
                "high prediction variance detected"
            );
        }
    }

    /// Turn a fallback estimate into a persistable row plus result.
    fn fallback_row(
        &self,
        operation: &FarmingOperation,
        category: &CostCategory,
        estimate: &fallback::FallbackEstimate,
    ) -> (Prediction, CategoryPrediction) {
        let target_date = timing::estimate_target_date(operation, category);
        let row = Prediction {
            id: Uuid::new_v4(),
            operation_id: operation.id,
            category_id: category.id,
            predicted_amount: estimate.predicted_amount,
            confidence_score: estimate.confidence_score,
            factors: estimate.factors.clone(),
            model_used: "fallback".into(),
            prediction_date: Utc::now(),
            target_date,
            actual_amount: None,
            prediction_error: None,
        };
        let result = CategoryPrediction {
            prediction_id: row.id,
            category_id: category.id,
            category_name: category.name.clone(),
            predicted_amount: row.predicted_amount,
            confidence_score: row.confidence_score,
            model_used: row.model_used.clone(),
            prediction_method: estimate.prediction_method,
            sample_count: 0,
            target_date,
            factors: row.factors.clone(),
        };
        (row, result)
    }
}

fn performance_key(category_id: Uuid) -> String {
    format!("model_performance_{category_id}")
}

fn validate_operation(operation: &FarmingOperation) -> Result<(), PredictionError> {
    if operation.total_acres <= Decimal::ZERO {
        return Err(PredictionError::InvalidArgument(
            "Operation must have positive acreage".into(),
        ));
    }
    if operation.season_start > operation.season_end {
        return Err(PredictionError::InvalidArgument(
            "Invalid season dates".into(),
        ));
    }
    if operation.is_completed(Utc::now().date_naive()) {
        tracing::warn!(
            operation = %operation.name,
            season_end = %operation.season_end,
            "predicting costs for a completed operation"
        );
    }
    Ok(())
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CostClass;
    use crate::store::testing::{category, crops_operation, seed_history, MockStore};
    use rust_decimal_macros::dec;

    fn service(store: Arc<MockStore>) -> PredictionService {
        PredictionService::new(store, EngineConfig::default())
    }

    #[tokio::test]
    async fn train_fails_below_minimum_and_caches_nothing() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fertilizers", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 9);

        let svc = service(store);
        let err = svc.train_model_for_category(cat.id).await.unwrap_err();
        assert!(matches!(
            err,
            PredictionError::InsufficientData { got: 9, needed: 10, .. }
        ));
        assert!(svc.cached_performance(cat.id).is_none());
    }

    #[tokio::test]
    async fn train_small_dataset_selects_ridge() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fertilizers", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 20);

        let svc = service(store);
        let perf = svc.train_model_for_category(cat.id).await.unwrap();
        assert_eq!(perf.model_id, "ridge");
        assert_eq!(perf.sample_count, 20);
        assert!(svc.cached_performance(cat.id).is_some());
    }

    #[tokio::test]
    async fn train_medium_dataset_selects_tree() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fuel", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 60);

        let svc = service(store);
        let perf = svc.train_model_for_category(cat.id).await.unwrap();
        assert_eq!(perf.model_id, "regression_tree");
    }

    #[tokio::test]
    async fn unknown_category_is_invalid_argument() {
        let svc = service(Arc::new(MockStore::default()));
        let err = svc
            .train_model_for_category(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn predict_persists_a_bounded_prediction() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fertilizers", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 20);
        let op = crops_operation(dec!(52));
        store.add_operation(op.clone());

        let svc = service(store.clone());
        let result = svc
            .predict_cost_for_operation(op.id, cat.id)
            .await
            .unwrap();

        assert!(result.predicted_amount >= Decimal::ZERO);
        assert!((0.0..=0.95).contains(&result.confidence_score));
        assert_eq!(result.model_used, "ridge");
        assert_eq!(result.prediction_method, "ml");
        assert_eq!(store.prediction_count(), 1);
    }

    #[tokio::test]
    async fn repredicting_updates_instead_of_duplicating() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fertilizers", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 20);
        let op = crops_operation(dec!(52));
        store.add_operation(op.clone());

        let svc = service(store.clone());
        svc.predict_cost_for_operation(op.id, cat.id).await.unwrap();
        svc.predict_cost_for_operation(op.id, cat.id).await.unwrap();

        assert_eq!(store.prediction_count(), 1);
    }

    #[tokio::test]
    async fn batch_mixes_fallback_and_errors_without_aborting() {
        let store = Arc::new(MockStore::default());
        // No history at all: ML fails everywhere. Three categories have
        // industry base rates, two have none.
        for name in ["Fertilizers", "Fuel", "Insurance"] {
            store.add_category(category(name, CostClass::Variable));
        }
        store.add_category(category("Drone Rental", CostClass::Variable));
        store.add_category(category("Scouting", CostClass::Variable));

        let op = crops_operation(dec!(50));
        store.add_operation(op.clone());

        let svc = service(store.clone());
        let outcome = svc.predict_all_costs_for_operation(op.id).await.unwrap();

        assert_eq!(outcome.categories_processed, 3);
        assert_eq!(outcome.categories_failed, 2);
        assert_eq!(outcome.success_rate, 60.0);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.contains_key("Drone Rental"));
        assert!(outcome.errors.contains_key("Scouting"));
        assert!(outcome.data_status.fallback_used);

        // Fertilizers at 180/acre on 50 acres, no adjustments.
        let fert = &outcome.predictions["Fertilizers"];
        assert_eq!(fert.predicted_amount, dec!(9000.00));
        assert_eq!(fert.confidence_score, 0.3);
        assert_eq!(fert.prediction_method, "industry_standards");
        assert_eq!(fert.model_used, "fallback");

        // All three fallback rows were persisted atomically.
        assert_eq!(store.prediction_count(), 3);
    }

    #[tokio::test]
    async fn batch_totals_and_per_acre() {
        let store = Arc::new(MockStore::default());
        store.add_category(category("Fertilizers", CostClass::Variable));
        store.add_category(category("Fuel", CostClass::Variable));
        let op = crops_operation(dec!(50));
        store.add_operation(op.clone());

        let svc = service(store);
        let outcome = svc.predict_all_costs_for_operation(op.id).await.unwrap();

        // 180*50 + 95*50 = 13750, per acre 275.
        assert_eq!(outcome.total_predicted_cost, dec!(13750.00));
        assert_eq!(outcome.predicted_cost_per_acre, dec!(275.00));
        assert_eq!(outcome.success_rate, 100.0);
    }

    #[tokio::test]
    async fn batch_storage_failure_aborts_the_call() {
        let store = Arc::new(MockStore::default());
        store.add_category(category("Fertilizers", CostClass::Variable));
        let op = crops_operation(dec!(50));
        store.add_operation(op.clone());
        *store.fail_atomic_upserts.lock().unwrap() = true;

        let svc = service(store.clone());
        let err = svc.predict_all_costs_for_operation(op.id).await.unwrap_err();
        assert!(matches!(err, PredictionError::Database(_)));
        assert_eq!(store.prediction_count(), 0);
    }

    #[tokio::test]
    async fn batch_requires_predictable_categories() {
        let store = Arc::new(MockStore::default());
        let mut cat = category("One-off Repairs", CostClass::Variable);
        cat.is_predictable = false;
        store.add_category(cat);
        let op = crops_operation(dec!(50));
        store.add_operation(op.clone());

        let svc = service(store);
        let err = svc.predict_all_costs_for_operation(op.id).await.unwrap_err();
        assert!(matches!(err, PredictionError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn actuals_update_the_persisted_row() {
        let store = Arc::new(MockStore::default());
        let cat = category("Fertilizers", CostClass::Variable);
        store.add_category(cat.clone());
        seed_history(&store, cat.id, 20);
        let op = crops_operation(dec!(52));
        store.add_operation(op.clone());

        let svc = service(store.clone());
        let result = svc
            .predict_cost_for_operation(op.id, cat.id)
            .await
            .unwrap();

        let row = store
            .predictions
            .lock()
            .unwrap()
            .values()
            .find(|p| p.id == result.prediction_id)
            .cloned()
            .unwrap();
        svc.record_actual_amount(&row, dec!(1000)).await.unwrap();

        let updated = store
            .predictions
            .lock()
            .unwrap()
            .values()
            .find(|p| p.id == result.prediction_id)
            .cloned()
            .unwrap();
        assert_eq!(updated.actual_amount, Some(dec!(1000)));
        assert!(updated.prediction_error.is_some());
    }
}
