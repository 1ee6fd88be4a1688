//! Command-line interface.
//!
//! Thin wrappers over the prediction service: train models, run single or
//! batch predictions, and report accuracy. Output is plain text; logs go
//! through tracing.

use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use uuid::Uuid;

use crate::domain::FarmingOperation;
use crate::predictor::PredictionService;
use crate::store::CostStore;
use crate::validation::ModelPerformance;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train prediction models for cost categories
    Train {
        /// Train only this category (default: all predictable categories)
        #[arg(short, long)]
        category: Option<Uuid>,
    },

    /// Predict and persist costs for all operations (or one)
    Predict {
        /// Limit the run to a single farming operation
        #[arg(long)]
        operation_id: Option<Uuid>,
    },

    /// Predict a single category for an operation
    PredictOne {
        /// Farming operation id
        operation: Uuid,

        /// Cost category id
        category: Uuid,
    },

    /// List farming operations and their ids
    Operations,

    /// Report prediction accuracy per category
    Accuracy,
}

/// Dispatch a parsed command.
pub async fn run_command(
    cmd: Command,
    service: &PredictionService,
    store: &Arc<dyn CostStore>,
) -> anyhow::Result<()> {
    match cmd {
        Command::Train { category } => run_train(service, store, category).await,
        Command::Predict { operation_id } => run_predict(service, store, operation_id).await,
        Command::PredictOne {
            operation,
            category,
        } => run_predict_one(service, operation, category).await,
        Command::Operations => run_operations(store).await,
        Command::Accuracy => run_accuracy(store).await,
    }
}

/// Train every predictable category, or just one.
async fn run_train(
    service: &PredictionService,
    store: &Arc<dyn CostStore>,
    category: Option<Uuid>,
) -> anyhow::Result<()> {
    let categories = match category {
        Some(id) => {
            let cat = store
                .get_category(id)
                .await?
                .with_context(|| format!("cost category {id} not found"))?;
            vec![cat]
        }
        None => store.list_predictable_categories().await?,
    };

    if categories.is_empty() {
        println!("No predictable cost categories found.");
        return Ok(());
    }

    println!("Training models for {} categories...", categories.len());
    println!();

    let mut trained = 0usize;
    for cat in &categories {
        match service.train_model_for_category(cat.id).await {
            Ok(perf) => {
                trained += 1;
                println!("{}", train_line(&cat.name, &perf));
            }
            Err(err) => {
                println!(" - {}: FAILED ({err})", cat.name);
            }
        }
    }

    println!();
    println!("Success: {trained}/{}", categories.len());
    Ok(())
}

fn train_line(name: &str, perf: &ModelPerformance) -> String {
    format!(
        " - {name}: OK (model={}, mape={:.1}%, samples={})",
        perf.model_id, perf.mape, perf.sample_count
    )
}

/// Batch predict+persist for every operation, or one when
/// `--operation-id` is given. Per-operation failures are reported, not
/// fatal.
async fn run_predict(
    service: &PredictionService,
    store: &Arc<dyn CostStore>,
    operation_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let operations = match operation_id {
        Some(id) => {
            let op = store
                .get_operation(id)
                .await?
                .with_context(|| format!("farming operation {id} not found"))?;
            vec![op]
        }
        None => store.list_operations().await?,
    };

    if operations.is_empty() {
        println!("No farming operations found.");
        return Ok(());
    }

    println!("Predicting costs for {} operations...", operations.len());
    println!();

    let summary = predict_sweep(service, &operations).await;

    println!();
    println!(
        "Saved {} predictions across {} operations, {} failed.",
        summary.saved, summary.succeeded, summary.failed
    );
    Ok(())
}

struct SweepSummary {
    /// Predictions saved across all operations.
    saved: usize,
    succeeded: usize,
    failed: usize,
}

/// Predict every operation in turn, printing one line each.
async fn predict_sweep(
    service: &PredictionService,
    operations: &[FarmingOperation],
) -> SweepSummary {
    let mut summary = SweepSummary {
        saved: 0,
        succeeded: 0,
        failed: 0,
    };
    for op in operations {
        match service.predict_all_costs_for_operation(op.id).await {
            Ok(outcome) => {
                summary.saved += outcome.categories_processed;
                summary.succeeded += 1;
                println!(
                    " - {}: saved {} predictions, total {} ({:.1}% success)",
                    op.name,
                    outcome.categories_processed,
                    outcome.total_predicted_cost,
                    outcome.success_rate
                );
            }
            Err(err) => {
                summary.failed += 1;
                println!(" - {}: FAILED ({err})", op.name);
            }
        }
    }
    summary
}

async fn run_predict_one(
    service: &PredictionService,
    operation: Uuid,
    category: Uuid,
) -> anyhow::Result<()> {
    let p = service
        .predict_cost_for_operation(operation, category)
        .await?;
    println!(
        "{}: {} (confidence {:.0}%, {} via {}, {} samples, due {})",
        p.category_name,
        p.predicted_amount,
        p.confidence_score * 100.0,
        p.prediction_method,
        p.model_used,
        p.sample_count,
        p.target_date
    );
    Ok(())
}

async fn run_operations(store: &Arc<dyn CostStore>) -> anyhow::Result<()> {
    let operations = store.list_operations().await?;
    if operations.is_empty() {
        println!("No farming operations found.");
        return Ok(());
    }

    for op in &operations {
        println!(
            " - {} {} ({}, {} acres, {} to {})",
            op.id, op.name, op.operation_type, op.total_acres, op.season_start, op.season_end
        );
    }
    Ok(())
}

/// Accuracy report over predictions with recorded actuals.
async fn run_accuracy(store: &Arc<dyn CostStore>) -> anyhow::Result<()> {
    let stats = store.prediction_accuracy_stats().await?;
    if stats.is_empty() {
        println!("No predictions with recorded actuals yet.");
        return Ok(());
    }

    println!("Prediction accuracy by category:");
    println!();
    for s in &stats {
        match s.avg_error {
            Some(avg) => println!(
                " - {}: avg error {:.1}% over {} predictions (worst {:.1}%)",
                s.category_name,
                avg * 100.0,
                s.prediction_count,
                s.max_error.unwrap_or(avg) * 100.0
            ),
            None => println!(
                " - {}: {} predictions, no error data",
                s.category_name, s.prediction_count
            ),
        }
    }
    Ok(())
}
