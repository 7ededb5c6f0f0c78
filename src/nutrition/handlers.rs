use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    dates,
    error::{AppError, AppResult},
    state::AppState,
};

use super::dto::{DailyNutrition, DailyQuery, MonthlyQuery, RangeNutrition, WeeklyQuery};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/daily", get(daily))
        .route("/nutrition/weekly", get(weekly))
        .route("/nutrition/monthly", get(monthly))
}

#[instrument(skip(state))]
pub async fn daily(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<DailyQuery>,
) -> AppResult<Json<DailyNutrition>> {
    let date = dates::parse_date(&p.date)
        .ok_or_else(|| AppError::validation("date must be YYYY-MM-DD"))?;
    Ok(Json(services::daily(&state, user_id, date).await?))
}

#[instrument(skip(state))]
pub async fn weekly(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<WeeklyQuery>,
) -> AppResult<Json<RangeNutrition>> {
    let start = dates::parse_date(&p.start)
        .ok_or_else(|| AppError::validation("start must be YYYY-MM-DD"))?;
    let end = dates::parse_date(&p.end)
        .ok_or_else(|| AppError::validation("end must be YYYY-MM-DD"))?;
    Ok(Json(services::weekly(&state, user_id, start, end).await?))
}

#[instrument(skip(state))]
pub async fn monthly(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<MonthlyQuery>,
) -> AppResult<Json<RangeNutrition>> {
    Ok(Json(
        services::monthly(&state, user_id, p.year, p.month).await?,
    ))
}
