use serde::{Deserialize, Serialize};
use time::Date;

use crate::dates;

/// One day's aggregated nutrition. Zero-valued when no meals were logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    #[serde(with = "dates::iso_date")]
    pub date: Date,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub meal_count: i64,
}

impl DaySummary {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            total_calories: 0.0,
            total_protein_g: 0.0,
            total_carbs_g: 0.0,
            total_fat_g: 0.0,
            meal_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyNutrition {
    #[serde(flatten)]
    pub summary: DaySummary,
    /// The user's configured goal; embedded in the cached payload, which is
    /// why goal changes invalidate these entries.
    pub daily_calorie_goal: Option<f64>,
}

/// A per-day series over an inclusive date range, used for both weekly and
/// monthly views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeNutrition {
    #[serde(with = "dates::iso_date")]
    pub start_date: Date,
    #[serde(with = "dates::iso_date")]
    pub end_date: Date,
    pub days: Vec<DaySummary>,
    pub total_calories: f64,
    pub daily_calorie_goal: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: i32,
    pub month: u8,
}
