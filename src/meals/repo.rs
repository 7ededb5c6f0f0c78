use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use super::dto::MealType;
use super::services::{NutrientTotals, PreparedLine};

#[derive(Debug, Clone, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: MealType,
    pub meal_date: Date,
    pub meal_time: Option<Time>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub created_at: OffsetDateTime,
}

/// A meal's line joined with its food name, for API responses.
#[derive(Debug, FromRow)]
pub struct MealLineRow {
    pub food_id: Uuid,
    pub food_name: String,
    pub quantity: f64,
    pub calories: f64,
}

/// A remaining line joined with its food's per-100 nutrient profile, the
/// input for a full totals re-sum.
#[derive(Debug, FromRow)]
pub struct LineNutrients {
    pub quantity: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

const MEAL_COLUMNS: &str = "id, user_id, meal_type, meal_date, meal_time, name, notes, \
                            total_calories, total_protein_g, total_carbs_g, total_fat_g, created_at";

impl MealRow {
    pub async fn fetch_owned(
        db: &PgPool,
        meal_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<MealRow>> {
        let meal = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2"
        ))
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(meal)
    }

    /// Ownership-scoped row lock. Serializes concurrent edits of the same
    /// meal for the duration of the transaction; a meal owned by someone else
    /// reads as absent.
    pub async fn lock_owned(
        tx: &mut Transaction<'_, Postgres>,
        meal_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<MealRow>> {
        let meal = sqlx::query_as::<_, MealRow>(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(meal_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(meal)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        meal_type: MealType,
        meal_date: Date,
        meal_time: Option<Time>,
        name: Option<&str>,
        notes: Option<&str>,
        totals: &NutrientTotals,
    ) -> anyhow::Result<MealRow> {
        let meal = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            INSERT INTO meals (user_id, meal_type, meal_date, meal_time, name, notes,
                               total_calories, total_protein_g, total_carbs_g, total_fat_g)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(meal_type)
        .bind(meal_date)
        .bind(meal_time)
        .bind(name)
        .bind(notes)
        .bind(totals.calories)
        .bind(totals.protein_g)
        .bind(totals.carbs_g)
        .bind(totals.fat_g)
        .fetch_one(&mut **tx)
        .await?;
        Ok(meal)
    }

    /// Patch the scalar fields; absent values keep the current column.
    pub async fn update_fields(
        tx: &mut Transaction<'_, Postgres>,
        meal_id: Uuid,
        meal_type: Option<MealType>,
        meal_date: Option<Date>,
        meal_time: Option<Time>,
        name: Option<&str>,
        notes: Option<&str>,
    ) -> anyhow::Result<MealRow> {
        let meal = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            UPDATE meals
            SET meal_type = COALESCE($2, meal_type),
                meal_date = COALESCE($3, meal_date),
                meal_time = COALESCE($4, meal_time),
                name = COALESCE($5, name),
                notes = COALESCE($6, notes)
            WHERE id = $1
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(meal_id)
        .bind(meal_type)
        .bind(meal_date)
        .bind(meal_time)
        .bind(name)
        .bind(notes)
        .fetch_one(&mut **tx)
        .await?;
        Ok(meal)
    }

    pub async fn update_totals(
        tx: &mut Transaction<'_, Postgres>,
        meal_id: Uuid,
        totals: &NutrientTotals,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE meals
            SET total_calories = $2, total_protein_g = $3, total_carbs_g = $4, total_fat_g = $5
            WHERE id = $1
            "#,
        )
        .bind(meal_id)
        .bind(totals.calories)
        .bind(totals.protein_g)
        .bind(totals.carbs_g)
        .bind(totals.fat_g)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Parent-row delete; the caller removes the lines first inside the same
    /// transaction (explicit two-step, no ORM cascade).
    pub async fn delete(tx: &mut Transaction<'_, Postgres>, meal_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(meal_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        date: Option<Date>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealRow>> {
        let rows = sqlx::query_as::<_, MealRow>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE user_id = $1
              AND ($2::date IS NULL OR meal_date = $2)
            ORDER BY meal_date DESC, created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(date)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    lines: &[PreparedLine],
) -> anyhow::Result<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO meal_foods (meal_id, food_id, quantity, calories)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(meal_id)
        .bind(line.food_id)
        .bind(line.quantity)
        .bind(line.calories)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn delete_lines(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM meal_foods WHERE meal_id = $1")
        .bind(meal_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Delete one line; returns how many rows matched so the caller can map zero
/// to NotFound.
pub async fn delete_line(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    food_id: Uuid,
) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM meal_foods WHERE meal_id = $1 AND food_id = $2")
        .bind(meal_id)
        .bind(food_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

pub async fn lines_for_meal(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Vec<MealLineRow>> {
    let lines = sqlx::query_as::<_, MealLineRow>(
        r#"
        SELECT mf.food_id, f.name AS food_name, mf.quantity, mf.calories
        FROM meal_foods mf
        JOIN foods f ON f.id = mf.food_id
        WHERE mf.meal_id = $1
        ORDER BY f.name
        "#,
    )
    .bind(meal_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

/// Remaining lines with their foods' per-100 profiles, read inside the write
/// transaction so the re-sum sees exactly what will persist.
pub async fn remaining_line_nutrients(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<Vec<LineNutrients>> {
    let lines = sqlx::query_as::<_, LineNutrients>(
        r#"
        SELECT mf.quantity, f.calories, f.protein_g, f.carbs_g, f.fat_g
        FROM meal_foods mf
        JOIN foods f ON f.id = mf.food_id
        WHERE mf.meal_id = $1
        "#,
    )
    .bind(meal_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(lines)
}
