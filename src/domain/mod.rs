//! Domain records for operations, cost categories, historical costs, and
//! predictions. All of them are read-only to the engine except
//! [`Prediction`], which it writes.

mod category;
mod cost;
mod operation;
mod prediction;

pub use category::{CostCategory, CostClass};
pub use cost::{CostRecord, ExternalFactors};
pub use operation::{FarmingOperation, OperationType, WeatherSummary};
pub use prediction::Prediction;
