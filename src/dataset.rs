//! Training-data preparation for category models.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::domain::{CostCategory, OperationType};
use crate::error::{DatabaseError, PredictionError};
use crate::features::FeatureVector;
use crate::store::CostStore;

/// Labeled samples for one category, plus diagnostics.
#[derive(Debug, Clone)]
pub struct TrainingData {
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    /// Records dropped by feature validation. Skipped, not failed.
    pub skipped: usize,
}

impl TrainingData {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Cache-backed mean historical amount for a category over operations of
/// one type. TTL-bounded so batch training doesn't re-aggregate per row.
pub async fn historical_avg(
    store: &dyn CostStore,
    cache: &TtlCache<f64>,
    ttl: Duration,
    category_id: Uuid,
    operation_type: OperationType,
) -> Result<f64, DatabaseError> {
    let key = format!("historical_avg_{category_id}_{operation_type}");
    if let Some(avg) = cache.get(&key) {
        return Ok(avg);
    }

    let avg = store
        .mean_amount_for_type(category_id, operation_type)
        .await?
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0);
    cache.put(key, avg, ttl);
    Ok(avg)
}

/// Build labeled training data for a category.
///
/// Storage already filters to records with positive amounts whose owning
/// operation has ended with positive acreage; here each record becomes one
/// (features, amount) sample, and rows failing feature validation are
/// counted but not fatal. Fails when fewer than `min_samples` usable
/// samples remain.
pub async fn prepare(
    store: &dyn CostStore,
    avg_cache: &TtlCache<f64>,
    ttl: Duration,
    category: &CostCategory,
    min_samples: usize,
    as_of: NaiveDate,
) -> Result<TrainingData, PredictionError> {
    let rows = store.training_rows(category.id, as_of).await?;
    if rows.is_empty() {
        return Err(PredictionError::NoHistoricalData {
            category: category.name.clone(),
        });
    }

    let mut samples = Vec::with_capacity(rows.len());
    let mut labels = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in &rows {
        let avg = historical_avg(
            store,
            avg_cache,
            ttl,
            category.id,
            row.operation.operation_type,
        )
        .await?;
        let features = FeatureVector::extract(&row.operation, avg, Some(&row.record));
        let label = row.record.amount.to_f64().unwrap_or(0.0);

        if features.is_valid() && label > 0.0 {
            samples.push(features.as_slice().to_vec());
            labels.push(label);
        } else {
            skipped += 1;
        }
    }

    if samples.len() < min_samples {
        tracing::warn!(
            category = %category.name,
            valid = samples.len(),
            skipped,
            "not enough valid training samples"
        );
        return Err(PredictionError::InsufficientData {
            category: category.name.clone(),
            needed: min_samples,
            got: samples.len(),
        });
    }

    tracing::info!(
        category = %category.name,
        valid_samples = samples.len(),
        skipped_samples = skipped,
        "training data prepared"
    );

    Ok(TrainingData {
        samples,
        labels,
        skipped,
    })
}
