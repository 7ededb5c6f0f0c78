use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

/// A catalog food with its per-100-unit nutrient profile. Immutable reference
/// data from the aggregation's perspective; nutrient values here are
/// authoritative for serving-size scaling.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub serving_size: f64,
    pub serving_unit: String,
    pub locale: Option<String>,
    pub user_id: Option<Uuid>,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
}

const FOOD_COLUMNS: &str = "id, name, calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g, \
                            sodium_mg, serving_size, serving_unit, locale, user_id, is_public, created_at";

impl Food {
    pub async fn get(db: &PgPool, food_id: Uuid) -> anyhow::Result<Option<Food>> {
        let food = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE id = $1"
        ))
        .bind(food_id)
        .fetch_optional(db)
        .await?;
        Ok(food)
    }

    /// Fetch the foods referenced by a meal's lines inside the meal's write
    /// transaction, so the scaling inputs and the persisted lines agree.
    pub async fn get_many(
        tx: &mut Transaction<'_, Postgres>,
        food_ids: &[Uuid],
    ) -> anyhow::Result<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE id = ANY($1)"
        ))
        .bind(food_ids)
        .fetch_all(&mut **tx)
        .await?;
        Ok(foods)
    }

    /// Foods visible to a user: the public catalog plus their own entries,
    /// optionally filtered by name substring and locale.
    pub async fn list_visible(
        db: &PgPool,
        user_id: Uuid,
        query: Option<&str>,
        locale: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Food>> {
        let foods = sqlx::query_as::<_, Food>(&format!(
            r#"
            SELECT {FOOD_COLUMNS}
            FROM foods
            WHERE (is_public OR user_id = $1)
              AND ($2::text IS NULL OR lower(name) LIKE '%' || lower($2) || '%')
              AND ($3::text IS NULL OR locale = $3)
            ORDER BY name
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(user_id)
        .bind(query)
        .bind(locale)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(foods)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        name: &str,
        calories: f64,
        protein_g: f64,
        carbs_g: f64,
        fat_g: f64,
        fiber_g: Option<f64>,
        sugar_g: Option<f64>,
        sodium_mg: Option<f64>,
        serving_size: f64,
        serving_unit: &str,
        locale: Option<&str>,
        is_public: bool,
    ) -> anyhow::Result<Food> {
        let food = sqlx::query_as::<_, Food>(&format!(
            r#"
            INSERT INTO foods (name, calories, protein_g, carbs_g, fat_g, fiber_g, sugar_g,
                               sodium_mg, serving_size, serving_unit, locale, user_id, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {FOOD_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(calories)
        .bind(protein_g)
        .bind(carbs_g)
        .bind(fat_g)
        .bind(fiber_g)
        .bind(sugar_g)
        .bind(sodium_mg)
        .bind(serving_size)
        .bind(serving_unit)
        .bind(locale)
        .bind(user_id)
        .bind(is_public)
        .fetch_one(db)
        .await?;
        Ok(food)
    }
}
