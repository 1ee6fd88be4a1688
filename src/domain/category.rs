//! Cost categories.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Whether a category behaves as a fixed or variable cost. Fixed costs get
/// an early default slot in the target-date timing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostClass {
    Fixed,
    Variable,
}

impl CostClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Variable => "variable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "variable" => Some(Self::Variable),
            _ => None,
        }
    }
}

/// A cost category. Immutable from the engine's perspective.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CostCategory {
    pub id: Uuid,
    pub name: String,
    pub cost_class: CostClass,
    /// Categories intentionally excluded from ML (irregular one-off costs)
    /// carry `false` and are skipped by the batch orchestrator.
    pub is_predictable: bool,
    pub typical_percentage: Option<Decimal>,
}
