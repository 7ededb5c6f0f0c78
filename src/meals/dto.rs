use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::dates;

/// Closed meal classification. Invalid values are rejected at the JSON
/// boundary as a validation failure, never coerced to a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FoodLineInput {
    pub food_id: Uuid,
    /// Serving quantity in the food's base unit (per-100 scaling).
    pub quantity: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub meal_type: MealType,
    #[serde(with = "dates::iso_date")]
    pub meal_date: Date,
    #[serde(default, with = "dates::clock_time_option")]
    pub meal_time: Option<Time>,
    pub name: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub foods: Vec<FoodLineInput>,
}

/// Partial update. When `foods` is present the line set is replaced wholesale
/// and totals are recomputed; when absent only the scalar fields are patched.
#[derive(Debug, Deserialize)]
pub struct UpdateMealRequest {
    pub meal_type: Option<MealType>,
    #[serde(default, with = "dates::iso_date_option")]
    pub meal_date: Option<Date>,
    #[serde(default, with = "dates::clock_time_option")]
    pub meal_time: Option<Time>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub foods: Option<Vec<FoodLineInput>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealFoodLine {
    pub food_id: Uuid,
    pub food_name: String,
    pub quantity: f64,
    pub calories: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealDetails {
    pub id: Uuid,
    pub meal_type: MealType,
    #[serde(with = "dates::iso_date")]
    pub meal_date: Date,
    #[serde(default, with = "dates::clock_time_option")]
    pub meal_time: Option<Time>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub foods: Vec<MealFoodLine>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MealListItem {
    pub id: Uuid,
    pub meal_type: MealType,
    #[serde(with = "dates::iso_date")]
    pub meal_date: Date,
    pub name: Option<String>,
    pub total_calories: f64,
}

#[derive(Debug, Deserialize)]
pub struct MealListQuery {
    /// Optional `YYYY-MM-DD` filter.
    pub date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_type_deserializes_lowercase() {
        let t: MealType = serde_json::from_str("\"breakfast\"").unwrap();
        assert_eq!(t, MealType::Breakfast);
    }

    #[test]
    fn meal_type_rejects_unknown_values() {
        assert!(serde_json::from_str::<MealType>("\"brunch\"").is_err());
    }

    #[test]
    fn create_request_parses_dates_and_lines() {
        let req: CreateMealRequest = serde_json::from_str(
            r#"{
                "meal_type": "lunch",
                "meal_date": "2024-01-10",
                "meal_time": "12:30",
                "foods": [{"food_id": "00000000-0000-0000-0000-000000000001", "quantity": 150.0}]
            }"#,
        )
        .unwrap();
        assert_eq!(req.meal_type, MealType::Lunch);
        assert_eq!(crate::dates::format_date(req.meal_date), "2024-01-10");
        assert!(req.meal_time.is_some());
        assert_eq!(req.foods.len(), 1);
    }

    #[test]
    fn update_request_distinguishes_absent_foods_from_empty() {
        let patch: UpdateMealRequest = serde_json::from_str(r#"{"name": "late lunch"}"#).unwrap();
        assert!(patch.foods.is_none());

        let replace: UpdateMealRequest = serde_json::from_str(r#"{"foods": []}"#).unwrap();
        assert_eq!(replace.foods.map(|f| f.len()), Some(0));
    }
}
