use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
};

use super::dto::{CreateFoodRequest, FoodQuery};
use super::repo::Food;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/foods", get(list_foods))
        .route("/foods/:id", get(get_food))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/foods", post(create_food))
}

#[instrument(skip(state))]
pub async fn list_foods(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<FoodQuery>,
) -> AppResult<Json<Vec<Food>>> {
    let limit = p.limit.clamp(1, 100);
    let foods = Food::list_visible(
        &state.db,
        user_id,
        p.q.as_deref(),
        p.locale.as_deref(),
        limit,
        p.offset.max(0),
    )
    .await?;
    Ok(Json(foods))
}

#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Food>> {
    let food = Food::get(&state.db, id)
        .await?
        .filter(|f| f.is_public || f.user_id == Some(user_id))
        .ok_or(AppError::NotFound("food"))?;
    Ok(Json(food))
}

#[instrument(skip(state, payload))]
pub async fn create_food(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateFoodRequest>,
) -> AppResult<(StatusCode, Json<Food>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    let nutrients = [
        payload.calories,
        payload.protein_g,
        payload.carbs_g,
        payload.fat_g,
        payload.fiber_g.unwrap_or(0.0),
        payload.sugar_g.unwrap_or(0.0),
        payload.sodium_mg.unwrap_or(0.0),
    ];
    if nutrients.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AppError::validation("nutrient values must be non-negative"));
    }
    if payload.serving_size <= 0.0 {
        return Err(AppError::validation("serving_size must be positive"));
    }

    let food = Food::create(
        &state.db,
        user_id,
        payload.name.trim(),
        payload.calories,
        payload.protein_g,
        payload.carbs_g,
        payload.fat_g,
        payload.fiber_g,
        payload.sugar_g,
        payload.sodium_mg,
        payload.serving_size,
        &payload.serving_unit,
        payload.locale.as_deref(),
        payload.is_public,
    )
    .await?;

    info!(food_id = %food.id, user_id = %user_id, "food created");
    Ok((StatusCode::CREATED, Json(food)))
}
