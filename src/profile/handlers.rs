use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    cache::invalidation,
    error::{AppError, AppResult},
    state::AppState,
};

use super::repo::UserProfile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile", put(update_profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub daily_calorie_goal: Option<f64>,
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserProfile>> {
    let profile = UserProfile::get_or_create(&state.db, user_id).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    if let Some(goal) = payload.daily_calorie_goal {
        if !goal.is_finite() || goal <= 0.0 {
            return Err(AppError::validation("daily_calorie_goal must be positive"));
        }
    }

    let profile = UserProfile::set_goal(&state.db, user_id, payload.daily_calorie_goal).await?;

    // The goal is embedded in every cached summary, so they all go stale.
    let plan = invalidation::goal_changed(user_id);
    invalidation::apply(state.cache.as_ref(), &plan).await;

    info!(user_id = %user_id, goal = ?profile.daily_calorie_goal, "calorie goal updated");
    Ok(Json(profile))
}
