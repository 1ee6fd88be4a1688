//! Target-date estimation: when within a season a category's cost lands.
//!
//! Category names are matched case-insensitively against an ordered
//! keyword table; the first hit wins. The table maps to a fractional
//! position within the season. Kept as a data table so it can be tested
//! and extended without touching control flow.

use chrono::{Days, NaiveDate};

use crate::domain::{CostCategory, CostClass, FarmingOperation};

/// Ordered (keywords, season fraction) pairs. First match wins.
const TIMING_TABLE: &[(&[&str], f64)] = &[
    (&["seed", "plant"], 0.05),
    (&["fertilizer", "soil"], 0.15),
    (&["pest", "spray"], 0.4),
    (&["fuel", "maintenance"], 0.5),
    (&["labor"], 0.6),
    (&["harvest"], 0.85),
    (&["storage", "transport"], 0.9),
];

/// Fixed costs with no keyword match land early in the season.
const FIXED_COST_FRACTION: f64 = 0.1;
const DEFAULT_FRACTION: f64 = 0.5;

/// Fraction of the season at which this category's cost is expected.
pub fn season_fraction(category_name: &str, cost_class: CostClass) -> f64 {
    let name = category_name.to_lowercase();
    for (keywords, fraction) in TIMING_TABLE {
        if keywords.iter().any(|k| name.contains(k)) {
            return *fraction;
        }
    }
    if cost_class == CostClass::Fixed {
        FIXED_COST_FRACTION
    } else {
        DEFAULT_FRACTION
    }
}

/// Estimated calendar date the cost will be incurred:
/// season start + floor(season length × fraction).
pub fn estimate_target_date(operation: &FarmingOperation, category: &CostCategory) -> NaiveDate {
    let fraction = season_fraction(&category.name, category.cost_class);
    let days = (operation.season_length_days() as f64 * fraction) as u64;
    operation
        .season_start
        .checked_add_days(Days::new(days))
        .unwrap_or(operation.season_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn category(name: &str, cost_class: CostClass) -> CostCategory {
        CostCategory {
            id: Uuid::new_v4(),
            name: name.into(),
            cost_class,
            is_predictable: true,
            typical_percentage: None,
        }
    }

    #[test]
    fn keyword_fractions() {
        use CostClass::Variable;
        assert_eq!(season_fraction("Seeds/Seedlings", Variable), 0.05);
        assert_eq!(season_fraction("Fertilizers", Variable), 0.15);
        assert_eq!(season_fraction("Pesticides", Variable), 0.4);
        assert_eq!(season_fraction("Fuel", Variable), 0.5);
        assert_eq!(season_fraction("Seasonal Labor", Variable), 0.6);
        assert_eq!(season_fraction("Harvest Services", Variable), 0.85);
        assert_eq!(season_fraction("Transportation", Variable), 0.9);
    }

    #[test]
    fn match_is_case_insensitive() {
        assert_eq!(season_fraction("SEEDS", CostClass::Variable), 0.05);
        assert_eq!(season_fraction("Storage Fees", CostClass::Fixed), 0.9);
    }

    #[test]
    fn fixed_class_fallback_then_default() {
        assert_eq!(season_fraction("Insurance", CostClass::Fixed), 0.1);
        assert_eq!(season_fraction("Miscellaneous", CostClass::Variable), 0.5);
    }

    #[test]
    fn earlier_table_entries_win() {
        // "plant" (0.05) appears before "labor" (0.6).
        assert_eq!(season_fraction("Planting Labor", CostClass::Variable), 0.05);
    }

    #[test]
    fn target_date_floors_the_offset() {
        let operation = FarmingOperation {
            id: Uuid::new_v4(),
            name: "Test".into(),
            operation_type: crate::domain::OperationType::Crops,
            total_acres: dec!(50),
            season_start: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            season_end: NaiveDate::from_ymd_opt(2025, 10, 28).unwrap(),
            expected_yield: None,
            yield_unit: None,
            commodity_price: None,
            location: None,
            weather: None,
        };
        // 210-day season, harvest at 0.85 -> day 178.
        let date = estimate_target_date(&operation, &category("Harvest", CostClass::Variable));
        assert_eq!(
            date,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap() + Days::new(178)
        );
    }
}
