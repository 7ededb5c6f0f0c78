use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    cache::{self, keys},
    dates,
    error::{AppError, AppResult},
    state::AppState,
};

use super::dto::{
    CreateMealRequest, MealDetails, MealListItem, MealListQuery, UpdateMealRequest,
};
use super::repo::MealRow;
use super::services;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/:id", put(update_meal))
        .route("/meals/:id", delete(delete_meal))
        .route("/meals/:id/foods/:food_id", delete(remove_food_line))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<MealListQuery>,
) -> AppResult<Json<Vec<MealListItem>>> {
    let date = match &p.date {
        Some(raw) => Some(
            dates::parse_date(raw)
                .ok_or_else(|| AppError::validation("date must be YYYY-MM-DD"))?,
        ),
        None => None,
    };
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);

    let key = keys::user_meals(user_id, limit, offset, date);
    if let Some(cached) = cache::get_json::<Vec<MealListItem>>(state.cache.as_ref(), &key).await {
        return Ok(Json(cached));
    }

    let meals = MealRow::list_by_user(&state.db, user_id, date, limit, offset).await?;
    let items: Vec<MealListItem> = meals
        .into_iter()
        .map(|m| MealListItem {
            id: m.id,
            meal_type: m.meal_type,
            meal_date: m.meal_date,
            name: m.name,
            total_calories: m.total_calories,
        })
        .collect();

    cache::put_json(state.cache.as_ref(), &key, &items, state.cache_ttl()).await;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MealDetails>> {
    let key = keys::meal(id, user_id);
    if let Some(cached) = cache::get_json::<MealDetails>(state.cache.as_ref(), &key).await {
        return Ok(Json(cached));
    }

    let details = services::load_details(&state, id, user_id).await?;
    cache::put_json(state.cache.as_ref(), &key, &details, state.cache_ttl()).await;
    Ok(Json(details))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> AppResult<(StatusCode, Json<MealDetails>)> {
    let details = services::create_meal(&state, user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMealRequest>,
) -> AppResult<Json<MealDetails>> {
    let details = services::update_meal(&state, id, user_id, payload).await?;
    Ok(Json(details))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if services::delete_meal(&state, id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("meal"))
    }
}

#[instrument(skip(state))]
pub async fn remove_food_line(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, food_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<MealDetails>> {
    let details = services::remove_food_line(&state, id, food_id, user_id).await?;
    Ok(Json(details))
}
