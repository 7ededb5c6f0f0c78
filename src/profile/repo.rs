use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub daily_calorie_goal: Option<f64>,
    pub updated_at: OffsetDateTime,
}

impl UserProfile {
    /// Fetch the profile, creating the default row on first access.
    pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> anyhow::Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, daily_calorie_goal, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;
        Ok(profile)
    }

    pub async fn set_goal(
        db: &PgPool,
        user_id: Uuid,
        daily_calorie_goal: Option<f64>,
    ) -> anyhow::Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, daily_calorie_goal, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET daily_calorie_goal = EXCLUDED.daily_calorie_goal, updated_at = now()
            RETURNING user_id, daily_calorie_goal, updated_at
            "#,
        )
        .bind(user_id)
        .bind(daily_calorie_goal)
        .fetch_one(db)
        .await?;
        Ok(profile)
    }
}

/// Read just the goal for summary payloads; a missing profile reads as no
/// goal configured.
pub async fn daily_calorie_goal(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<f64>> {
    let goal: Option<(Option<f64>,)> =
        sqlx::query_as("SELECT daily_calorie_goal FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(goal.and_then(|(g,)| g))
}
