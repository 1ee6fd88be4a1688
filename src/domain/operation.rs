//! Farming operations and their season/weather context.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// What kind of operation this is. Drives the one-hot feature encoding and
/// the industry-standard fallback tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Crops,
    Livestock,
    Mixed,
}

impl OperationType {
    /// Database string form, also used in cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crops => "crops",
            Self::Livestock => "livestock",
            Self::Mixed => "mixed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "crops" => Some(Self::Crops),
            "livestock" => Some(Self::Livestock),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Season weather aggregate supplied by the weather collaborator.
///
/// Every field is optional; the feature extractor applies defaults when
/// the whole record or individual fields are missing.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WeatherSummary {
    pub avg_temperature: Option<f64>,
    pub total_rainfall: Option<f64>,
    pub frost_days: Option<f64>,
    pub humidity_avg: Option<f64>,
    pub sunshine_hours: Option<f64>,
}

/// A single farming operation (one field/herd over one season).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FarmingOperation {
    pub id: Uuid,
    pub name: String,
    pub operation_type: OperationType,
    pub total_acres: Decimal,
    pub season_start: NaiveDate,
    pub season_end: NaiveDate,
    pub expected_yield: Option<Decimal>,
    pub yield_unit: Option<String>,
    pub commodity_price: Option<Decimal>,
    pub location: Option<String>,
    pub weather: Option<WeatherSummary>,
}

impl FarmingOperation {
    /// Number of days between season start and end.
    pub fn season_length_days(&self) -> i64 {
        (self.season_end - self.season_start).num_days()
    }

    /// Whether the season has ended as of `today`.
    pub fn is_completed(&self, today: NaiveDate) -> bool {
        today > self.season_end
    }
}
