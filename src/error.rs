//! Error types for the prediction engine.

/// Errors from the prediction and training pipeline.
///
/// Failures inside one category's prediction are recoverable (the batch
/// orchestrator records them and moves on); identity resolution and storage
/// failures abort the whole call.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    /// Not enough valid training samples for a category.
    #[error(
        "Insufficient training data for category '{category}'. Need at least {needed} samples, got {got}"
    )]
    InsufficientData {
        category: String,
        needed: usize,
        got: usize,
    },

    /// No usable historical cost records at all for a category.
    #[error("No historical data found for category: {category}")]
    NoHistoricalData { category: String },

    /// Unresolvable operation/category id or invalid inputs. Non-retryable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The industry-standard table has no entry for this category and
    /// operation type. Terminal for that category only.
    #[error("No fallback estimate available for category: {category}")]
    NoFallbackAvailable { category: String },

    /// Model training produced an unusable fit.
    #[error("Training failed for category '{category}': {reason}")]
    TrainingFailed { category: String, reason: String },

    /// Storage failure. Aborts the whole call.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to build the connection pool.
    #[error("Pool creation failed: {0}")]
    Pool(String),

    /// Failed to check a connection out of the pool.
    #[error("Connection error: {0}")]
    Connection(#[from] deadpool_postgres::PoolError),

    /// Query execution failed.
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Migration run failed.
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// A row held a value the domain model can't represent.
    #[error("Row decode error: {0}")]
    Decode(String),
}
