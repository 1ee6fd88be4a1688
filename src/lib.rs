//! Per-category operating cost prediction for farming operations.
//!
//! Historical cost records become 15-field feature vectors; each cost
//! category gets its own regression model, picked by sample count (ridge
//! below 50, a regression tree below 200, gradient boosting from 200 up).
//! Confidence comes from comparable operations, and categories without
//! enough data degrade to industry-standard per-acre estimates instead of
//! failing. Predictions persist upsert-style against operation, category,
//! and target date.

pub mod cache;
pub mod cli;
pub mod confidence;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod features;
pub mod model;
pub mod predictor;
pub mod store;
pub mod timing;
pub mod validation;

pub use error::{DatabaseError, PredictionError};
pub use predictor::{BatchOutcome, CategoryPrediction, PredictionService};
