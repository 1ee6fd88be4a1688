//! PostgreSQL implementation of the cost store.

use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool_postgres::{Config, Pool, Runtime};
use rust_decimal::Decimal;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::domain::{
    CostCategory, CostClass, CostRecord, FarmingOperation, OperationType, Prediction,
};
use crate::error::DatabaseError;
use crate::store::{CategoryAccuracy, CostStore, TrainingRow};

mod embedded {
    refinery::embed_migrations!("migrations");
}

const UPSERT_PREDICTION: &str = r#"
    INSERT INTO cost_predictions (
        id, farming_operation_id, cost_category_id, predicted_amount,
        confidence_score, prediction_factors, model_used, prediction_date,
        target_date, actual_amount, prediction_error
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (farming_operation_id, cost_category_id, target_date) DO UPDATE SET
        predicted_amount = EXCLUDED.predicted_amount,
        confidence_score = EXCLUDED.confidence_score,
        prediction_factors = EXCLUDED.prediction_factors,
        model_used = EXCLUDED.model_used,
        prediction_date = EXCLUDED.prediction_date
"#;

/// Postgres-backed store.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Create a store and verify a connection can be checked out.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url().to_string());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        let _ = pool.get().await?;

        Ok(Self { pool })
    }

    /// Run embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get().await?;
        let client = &mut **conn;
        let report = embedded::migrations::runner().run_async(client).await?;
        tracing::info!(
            applied = report.applied_migrations().len(),
            "database migrations complete"
        );
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }
}

fn operation_from_row(row: &Row) -> Result<FarmingOperation, DatabaseError> {
    let type_str: String = row.get("operation_type");
    let operation_type = OperationType::parse(&type_str)
        .ok_or_else(|| DatabaseError::Decode(format!("unknown operation type: {type_str}")))?;

    let weather: Option<serde_json::Value> = row.get("weather_data");
    let weather = match weather {
        Some(value) => Some(
            serde_json::from_value(value)
                .map_err(|e| DatabaseError::Decode(format!("weather_data: {e}")))?,
        ),
        None => None,
    };

    Ok(FarmingOperation {
        id: row.get("id"),
        name: row.get("name"),
        operation_type,
        total_acres: row.get("total_acres"),
        season_start: row.get("season_start"),
        season_end: row.get("season_end"),
        expected_yield: row.get("expected_yield"),
        yield_unit: row.get("yield_unit"),
        commodity_price: row.get("commodity_price"),
        location: row.get("location"),
        weather,
    })
}

fn category_from_row(row: &Row) -> Result<CostCategory, DatabaseError> {
    let class_str: String = row.get("cost_class");
    let cost_class = CostClass::parse(&class_str)
        .ok_or_else(|| DatabaseError::Decode(format!("unknown cost class: {class_str}")))?;

    Ok(CostCategory {
        id: row.get("id"),
        name: row.get("name"),
        cost_class,
        is_predictable: row.get("is_predictable"),
        typical_percentage: row.get("typical_percentage"),
    })
}

const OPERATION_COLUMNS: &str = "id, name, operation_type, total_acres, season_start, \
     season_end, expected_yield, yield_unit, commodity_price, location, weather_data";

const CATEGORY_COLUMNS: &str = "id, name, cost_class, is_predictable, typical_percentage";

#[async_trait]
impl CostStore for PgStore {
    async fn get_operation(&self, id: Uuid) -> Result<Option<FarmingOperation>, DatabaseError> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM farming_operations WHERE id = $1");
        let row = conn.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(operation_from_row).transpose()
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<CostCategory>, DatabaseError> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM cost_categories WHERE id = $1");
        let row = conn.query_opt(sql.as_str(), &[&id]).await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_operations(&self) -> Result<Vec<FarmingOperation>, DatabaseError> {
        let conn = self.conn().await?;
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM farming_operations ORDER BY name");
        let rows = conn.query(sql.as_str(), &[]).await?;
        rows.iter().map(operation_from_row).collect()
    }

    async fn list_predictable_categories(&self) -> Result<Vec<CostCategory>, DatabaseError> {
        let conn = self.conn().await?;
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM cost_categories WHERE is_predictable ORDER BY name"
        );
        let rows = conn.query(sql.as_str(), &[]).await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn training_rows(
        &self,
        category_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Vec<TrainingRow>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                r#"
                SELECT
                    fc.id AS cost_id,
                    fc.amount,
                    fc.incurred_date,
                    fc.quantity,
                    fc.unit,
                    fc.unit_price,
                    fc.external_factors,
                    fo.id,
                    fo.name,
                    fo.operation_type,
                    fo.total_acres,
                    fo.season_start,
                    fo.season_end,
                    fo.expected_yield,
                    fo.yield_unit,
                    fo.commodity_price,
                    fo.location,
                    fo.weather_data
                FROM farming_costs fc
                JOIN farming_operations fo ON fo.id = fc.farming_operation_id
                WHERE fc.cost_category_id = $1
                  AND fc.amount > 0
                  AND fo.season_end < $2
                  AND fo.total_acres > 0
                ORDER BY fc.incurred_date
                "#,
                &[&category_id, &as_of],
            )
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let operation = operation_from_row(row)?;

            let external: Option<serde_json::Value> = row.get("external_factors");
            let external_factors = match external {
                Some(value) => Some(
                    serde_json::from_value(value)
                        .map_err(|e| DatabaseError::Decode(format!("external_factors: {e}")))?,
                ),
                None => None,
            };

            let record = CostRecord {
                id: row.get("cost_id"),
                operation_id: operation.id,
                category_id,
                amount: row.get("amount"),
                incurred_date: row.get("incurred_date"),
                quantity: row.get("quantity"),
                unit: row.get("unit"),
                unit_price: row.get("unit_price"),
                external_factors,
            };
            out.push(TrainingRow { record, operation });
        }
        Ok(out)
    }

    async fn mean_amount_for_type(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
    ) -> Result<Option<Decimal>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                r#"
                SELECT AVG(fc.amount) AS mean_amount
                FROM farming_costs fc
                JOIN farming_operations fo ON fo.id = fc.farming_operation_id
                WHERE fc.cost_category_id = $1
                  AND fo.operation_type = $2
                "#,
                &[&category_id, &operation_type.as_str()],
            )
            .await?;
        Ok(row.get("mean_amount"))
    }

    async fn comparable_amounts(
        &self,
        category_id: Uuid,
        operation_type: OperationType,
        acres_low: Decimal,
        acres_high: Decimal,
        since: NaiveDate,
    ) -> Result<Vec<Decimal>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                r#"
                SELECT fc.amount
                FROM farming_costs fc
                JOIN farming_operations fo ON fo.id = fc.farming_operation_id
                WHERE fc.cost_category_id = $1
                  AND fo.operation_type = $2
                  AND fo.total_acres BETWEEN $3 AND $4
                  AND fc.incurred_date >= $5
                "#,
                &[
                    &category_id,
                    &operation_type.as_str(),
                    &acres_low,
                    &acres_high,
                    &since,
                ],
            )
            .await?;
        Ok(rows.iter().map(|r| r.get("amount")).collect())
    }

    async fn count_cost_records(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) AS total FROM farming_costs", &[])
            .await?;
        Ok(row.get("total"))
    }

    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(UPSERT_PREDICTION, &prediction_params(prediction))
            .await?;
        Ok(())
    }

    async fn upsert_predictions_atomic(
        &self,
        predictions: &[Prediction],
    ) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await?;
        let stmt = tx.prepare(UPSERT_PREDICTION).await?;
        for prediction in predictions {
            tx.execute(&stmt, &prediction_params(prediction)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_actual_amount(
        &self,
        prediction_id: Uuid,
        actual: Decimal,
        error: Option<f64>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "UPDATE cost_predictions SET actual_amount = $2, prediction_error = $3 WHERE id = $1",
            &[&prediction_id, &actual, &error],
        )
        .await?;
        Ok(())
    }

    async fn prediction_accuracy_stats(&self) -> Result<Vec<CategoryAccuracy>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                r#"
                SELECT
                    cp.cost_category_id,
                    cc.name AS category_name,
                    COUNT(*) AS prediction_count,
                    AVG(cp.prediction_error) AS avg_error,
                    MIN(cp.prediction_error) AS min_error,
                    MAX(cp.prediction_error) AS max_error,
                    AVG(cp.confidence_score) AS avg_confidence
                FROM cost_predictions cp
                JOIN cost_categories cc ON cc.id = cp.cost_category_id
                WHERE cp.actual_amount IS NOT NULL
                GROUP BY cp.cost_category_id, cc.name
                ORDER BY cc.name
                "#,
                &[],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryAccuracy {
                category_id: row.get("cost_category_id"),
                category_name: row.get("category_name"),
                prediction_count: row.get("prediction_count"),
                avg_error: row.get("avg_error"),
                min_error: row.get("min_error"),
                max_error: row.get("max_error"),
                avg_confidence: row.get("avg_confidence"),
            })
            .collect())
    }
}

/// Shared parameter list for the upsert statement.
fn prediction_params(p: &Prediction) -> [&(dyn tokio_postgres::types::ToSql + Sync); 11] {
    [
        &p.id,
        &p.operation_id,
        &p.category_id,
        &p.predicted_amount,
        &p.confidence_score,
        &p.factors,
        &p.model_used,
        &p.prediction_date,
        &p.target_date,
        &p.actual_amount,
        &p.prediction_error,
    ]
}
