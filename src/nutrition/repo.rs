use sqlx::{FromRow, PgPool};
use time::Date;
use uuid::Uuid;

/// Aggregated denormalized totals for one calendar day. Reads only the
/// meals' stored totals; food lines are never touched on the read path.
#[derive(Debug, FromRow)]
pub struct DayTotalsRow {
    pub meal_date: Date,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub meal_count: i64,
}

pub async fn day_totals(
    db: &PgPool,
    user_id: Uuid,
    date: Date,
) -> anyhow::Result<Option<DayTotalsRow>> {
    let row = sqlx::query_as::<_, DayTotalsRow>(
        r#"
        SELECT meal_date,
               COALESCE(SUM(total_calories), 0)  AS total_calories,
               COALESCE(SUM(total_protein_g), 0) AS total_protein_g,
               COALESCE(SUM(total_carbs_g), 0)   AS total_carbs_g,
               COALESCE(SUM(total_fat_g), 0)     AS total_fat_g,
               COUNT(*)                          AS meal_count
        FROM meals
        WHERE user_id = $1 AND meal_date = $2
        GROUP BY meal_date
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn range_day_totals(
    db: &PgPool,
    user_id: Uuid,
    start: Date,
    end: Date,
) -> anyhow::Result<Vec<DayTotalsRow>> {
    let rows = sqlx::query_as::<_, DayTotalsRow>(
        r#"
        SELECT meal_date,
               COALESCE(SUM(total_calories), 0)  AS total_calories,
               COALESCE(SUM(total_protein_g), 0) AS total_protein_g,
               COALESCE(SUM(total_carbs_g), 0)   AS total_carbs_g,
               COALESCE(SUM(total_fat_g), 0)     AS total_fat_g,
               COUNT(*)                          AS meal_count
        FROM meals
        WHERE user_id = $1 AND meal_date BETWEEN $2 AND $3
        GROUP BY meal_date
        ORDER BY meal_date
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
