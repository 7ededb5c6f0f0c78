//! Meal aggregate: nutrition math and the transactional write operations.
//!
//! The denormalized totals on a meal are an invariant, not a cache: after any
//! write that touches food lines, `total_calories` equals the sum of the
//! lines' scaled calories. Totals are always restored by a full re-sum over
//! the lines, never by incremental add/subtract, so floating-point drift
//! cannot accumulate across edits.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::{
    cache::invalidation,
    error::{AppError, AppResult},
    foods::repo::Food,
    state::AppState,
};

use super::dto::{CreateMealRequest, FoodLineInput, MealDetails, MealFoodLine, UpdateMealRequest};
use super::repo::{self, LineNutrients, MealRow};

/// Scale a per-100-unit nutrient value to a serving quantity.
pub fn scale_per_100(per_100: f64, quantity: f64) -> f64 {
    per_100 * quantity / 100.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// A food line ready to persist: quantity validated, calories denormalized.
#[derive(Debug, Clone)]
pub struct PreparedLine {
    pub food_id: Uuid,
    pub food_name: String,
    pub quantity: f64,
    pub calories: f64,
}

/// Validate the input lines against the fetched foods and compute the meal's
/// totals by summation. A referenced food missing from `foods` is NotFound;
/// a non-positive quantity is a validation failure.
pub fn prepare_lines(
    inputs: &[FoodLineInput],
    foods: &[Food],
) -> AppResult<(Vec<PreparedLine>, NutrientTotals)> {
    let by_id: HashMap<Uuid, &Food> = foods.iter().map(|f| (f.id, f)).collect();

    let mut lines = Vec::with_capacity(inputs.len());
    let mut totals = NutrientTotals::default();
    for input in inputs {
        if !input.quantity.is_finite() || input.quantity <= 0.0 {
            return Err(AppError::validation("quantity must be positive"));
        }
        let food = by_id
            .get(&input.food_id)
            .ok_or(AppError::NotFound("food"))?;

        let calories = scale_per_100(food.calories, input.quantity);
        totals.calories += calories;
        totals.protein_g += scale_per_100(food.protein_g, input.quantity);
        totals.carbs_g += scale_per_100(food.carbs_g, input.quantity);
        totals.fat_g += scale_per_100(food.fat_g, input.quantity);

        lines.push(PreparedLine {
            food_id: food.id,
            food_name: food.name.clone(),
            quantity: input.quantity,
            calories,
        });
    }
    Ok((lines, totals))
}

/// Full re-sum over the lines that remain after a removal.
pub fn totals_from_lines(lines: &[LineNutrients]) -> NutrientTotals {
    let mut totals = NutrientTotals::default();
    for line in lines {
        totals.calories += scale_per_100(line.calories, line.quantity);
        totals.protein_g += scale_per_100(line.protein_g, line.quantity);
        totals.carbs_g += scale_per_100(line.carbs_g, line.quantity);
        totals.fat_g += scale_per_100(line.fat_g, line.quantity);
    }
    totals
}

fn details_from_parts(meal: MealRow, foods: Vec<MealFoodLine>) -> MealDetails {
    MealDetails {
        id: meal.id,
        meal_type: meal.meal_type,
        meal_date: meal.meal_date,
        meal_time: meal.meal_time,
        name: meal.name,
        notes: meal.notes,
        total_calories: meal.total_calories,
        total_protein_g: meal.total_protein_g,
        total_carbs_g: meal.total_carbs_g,
        total_fat_g: meal.total_fat_g,
        foods,
        created_at: meal.created_at,
    }
}

/// Load a meal with its lines expanded, scoped to the owner.
pub async fn load_details(
    state: &AppState,
    meal_id: Uuid,
    user_id: Uuid,
) -> AppResult<MealDetails> {
    let meal = MealRow::fetch_owned(&state.db, meal_id, user_id)
        .await?
        .ok_or(AppError::NotFound("meal"))?;
    let lines = repo::lines_for_meal(&state.db, meal_id).await?;
    let foods = lines
        .into_iter()
        .map(|l| MealFoodLine {
            food_id: l.food_id,
            food_name: l.food_name,
            quantity: l.quantity,
            calories: l.calories,
        })
        .collect();
    Ok(details_from_parts(meal, foods))
}

async fn fetch_referenced_foods(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    inputs: &[FoodLineInput],
) -> AppResult<Vec<Food>> {
    let mut ids: Vec<Uuid> = inputs.iter().map(|l| l.food_id).collect();
    ids.sort();
    ids.dedup();
    let foods = Food::get_many(tx, &ids).await?;
    // prepare_lines reports the missing id as NotFound; nothing to do here.
    Ok(foods)
}

/// Create a meal with its lines as one atomic transaction, then invalidate
/// dependent cache entries. A zero-line meal is valid and has zero totals.
pub async fn create_meal(
    state: &AppState,
    user_id: Uuid,
    input: CreateMealRequest,
) -> AppResult<MealDetails> {
    let mut tx = state.db.begin().await?;

    let foods = fetch_referenced_foods(&mut tx, &input.foods).await?;
    let (lines, totals) = prepare_lines(&input.foods, &foods)?;

    let meal = MealRow::insert(
        &mut tx,
        user_id,
        input.meal_type,
        input.meal_date,
        input.meal_time,
        input.name.as_deref(),
        input.notes.as_deref(),
        &totals,
    )
    .await?;
    repo::insert_lines(&mut tx, meal.id, &lines).await?;

    tx.commit().await?;

    // Invalidation runs only after commit; a failed write must leave the
    // cache untouched.
    let plan = invalidation::meal_created(user_id, meal.meal_date);
    invalidation::apply(state.cache.as_ref(), &plan).await;

    info!(meal_id = %meal.id, user_id = %user_id, total_calories = meal.total_calories, "meal created");

    let foods = lines
        .into_iter()
        .map(|l| MealFoodLine {
            food_id: l.food_id,
            food_name: l.food_name,
            quantity: l.quantity,
            calories: l.calories,
        })
        .collect();
    Ok(details_from_parts(meal, foods))
}

/// Update a meal. With a replacement food set the lines are dropped and
/// rebuilt exactly as in create; without one only the scalar fields change
/// and the totals stay as they are.
pub async fn update_meal(
    state: &AppState,
    meal_id: Uuid,
    user_id: Uuid,
    input: UpdateMealRequest,
) -> AppResult<MealDetails> {
    let mut tx = state.db.begin().await?;

    let existing = MealRow::lock_owned(&mut tx, meal_id, user_id)
        .await?
        .ok_or(AppError::NotFound("meal"))?;
    let old_date = existing.meal_date;

    let meal = MealRow::update_fields(
        &mut tx,
        meal_id,
        input.meal_type,
        input.meal_date,
        input.meal_time,
        input.name.as_deref(),
        input.notes.as_deref(),
    )
    .await?;

    if let Some(food_inputs) = &input.foods {
        repo::delete_lines(&mut tx, meal_id).await?;
        let foods = fetch_referenced_foods(&mut tx, food_inputs).await?;
        let (lines, totals) = prepare_lines(food_inputs, &foods)?;
        repo::insert_lines(&mut tx, meal_id, &lines).await?;
        MealRow::update_totals(&mut tx, meal_id, &totals).await?;
    }

    let new_date = meal.meal_date;
    tx.commit().await?;

    let plan = invalidation::meal_changed(meal_id, user_id, old_date, Some(new_date));
    invalidation::apply(state.cache.as_ref(), &plan).await;

    info!(meal_id = %meal_id, user_id = %user_id, "meal updated");
    load_details(state, meal_id, user_id).await
}

/// Delete a meal and its lines. Returns false when the meal does not exist
/// for this user, so the handler can answer 404 without an error path.
pub async fn delete_meal(state: &AppState, meal_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let mut tx = state.db.begin().await?;

    let Some(meal) = MealRow::lock_owned(&mut tx, meal_id, user_id).await? else {
        return Ok(false);
    };

    repo::delete_lines(&mut tx, meal_id).await?;
    MealRow::delete(&mut tx, meal_id).await?;
    tx.commit().await?;

    let plan = invalidation::meal_changed(meal_id, meal.user_id, meal.meal_date, None);
    invalidation::apply(state.cache.as_ref(), &plan).await;

    info!(meal_id = %meal_id, user_id = %user_id, "meal deleted");
    Ok(true)
}

/// Remove a single line, then restore the totals invariant from the remaining
/// lines.
pub async fn remove_food_line(
    state: &AppState,
    meal_id: Uuid,
    food_id: Uuid,
    user_id: Uuid,
) -> AppResult<MealDetails> {
    let mut tx = state.db.begin().await?;

    let meal = MealRow::lock_owned(&mut tx, meal_id, user_id)
        .await?
        .ok_or(AppError::NotFound("meal"))?;

    let removed = repo::delete_line(&mut tx, meal_id, food_id).await?;
    if removed == 0 {
        return Err(AppError::NotFound("food line"));
    }

    let remaining = repo::remaining_line_nutrients(&mut tx, meal_id).await?;
    let totals = totals_from_lines(&remaining);
    MealRow::update_totals(&mut tx, meal_id, &totals).await?;
    tx.commit().await?;

    let plan = invalidation::meal_changed(meal_id, meal.user_id, meal.meal_date, None);
    invalidation::apply(state.cache.as_ref(), &plan).await;

    info!(meal_id = %meal_id, food_id = %food_id, user_id = %user_id, "food line removed");
    load_details(state, meal_id, user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn food(id: Uuid, name: &str, calories: f64, protein: f64, carbs: f64, fat: f64) -> Food {
        Food {
            id,
            name: name.into(),
            calories,
            protein_g: protein,
            carbs_g: carbs,
            fat_g: fat,
            fiber_g: None,
            sugar_g: None,
            sodium_mg: None,
            serving_size: 100.0,
            serving_unit: "g".into(),
            locale: None,
            user_id: None,
            is_public: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn scales_per_100_grams() {
        assert_eq!(scale_per_100(52.0, 150.0), 78.0);
        assert_eq!(scale_per_100(165.0, 50.0), 82.5);
    }

    #[test]
    fn worked_example_totals() {
        // Food A: 52 kcal/100g at 150g, Food B: 165 kcal/100g at 50g.
        let a = food(Uuid::new_v4(), "apple", 52.0, 0.3, 14.0, 0.2);
        let b = food(Uuid::new_v4(), "chicken", 165.0, 31.0, 0.0, 3.6);
        let inputs = vec![
            FoodLineInput {
                food_id: a.id,
                quantity: 150.0,
            },
            FoodLineInput {
                food_id: b.id,
                quantity: 50.0,
            },
        ];

        let (lines, totals) = prepare_lines(&inputs, &[a, b]).unwrap();
        assert_eq!(lines.len(), 2);
        assert!((totals.calories - 160.5).abs() < 1e-9);
        assert!((lines[0].calories - 78.0).abs() < 1e-9);
        assert!((lines[1].calories - 82.5).abs() < 1e-9);
    }

    #[test]
    fn totals_match_line_sum_invariant() {
        let foods: Vec<Food> = (0..5)
            .map(|i| food(Uuid::new_v4(), "f", 37.0 + i as f64 * 13.7, 1.1, 2.2, 3.3))
            .collect();
        let inputs: Vec<FoodLineInput> = foods
            .iter()
            .enumerate()
            .map(|(i, f)| FoodLineInput {
                food_id: f.id,
                quantity: 33.0 + i as f64 * 17.0,
            })
            .collect();

        let (lines, totals) = prepare_lines(&inputs, &foods).unwrap();
        let line_sum: f64 = lines.iter().map(|l| l.calories).sum();
        assert!((totals.calories - line_sum).abs() < 1e-9);
    }

    #[test]
    fn zero_lines_zero_totals() {
        let (lines, totals) = prepare_lines(&[], &[]).unwrap();
        assert!(lines.is_empty());
        assert_eq!(totals, NutrientTotals::default());
    }

    #[test]
    fn missing_food_is_not_found() {
        let known = food(Uuid::new_v4(), "apple", 52.0, 0.3, 14.0, 0.2);
        let inputs = vec![
            FoodLineInput {
                food_id: known.id,
                quantity: 100.0,
            },
            FoodLineInput {
                food_id: Uuid::new_v4(),
                quantity: 100.0,
            },
        ];
        let err = prepare_lines(&inputs, &[known]).unwrap_err();
        assert!(matches!(err, AppError::NotFound("food")));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let f = food(Uuid::new_v4(), "apple", 52.0, 0.3, 14.0, 0.2);
        for quantity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let inputs = vec![FoodLineInput {
                food_id: f.id,
                quantity,
            }];
            assert!(matches!(
                prepare_lines(&inputs, std::slice::from_ref(&f)),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn removal_recomputes_from_remaining_lines() {
        // After dropping the 82.5 kcal line, the re-sum leaves exactly 78.0.
        let remaining = vec![LineNutrients {
            quantity: 150.0,
            calories: 52.0,
            protein_g: 0.3,
            carbs_g: 14.0,
            fat_g: 0.2,
        }];
        let totals = totals_from_lines(&remaining);
        assert!((totals.calories - 78.0).abs() < 1e-9);
    }
}
