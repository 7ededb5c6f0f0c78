//! Nutrition reporting: cache-aside summaries over the meals' denormalized
//! totals.
//!
//! All three reads are idempotent; a cache hit returns exactly what a forced
//! recompute would. The cache is consulted first, the store only on miss, and
//! the result is written back before returning.

use std::collections::HashMap;

use time::{Date, Month};
use uuid::Uuid;

use crate::{
    cache::{self, keys},
    error::{AppError, AppResult},
    profile,
    state::AppState,
};

use super::dto::{DailyNutrition, DaySummary, RangeNutrition};
use super::repo::{self, DayTotalsRow};

/// Longest range a grouped query will serve; keeps the cache keyspace and the
/// response size bounded.
const MAX_RANGE_DAYS: i64 = 366;

impl From<DayTotalsRow> for DaySummary {
    fn from(row: DayTotalsRow) -> Self {
        Self {
            date: row.meal_date,
            total_calories: row.total_calories,
            total_protein_g: row.total_protein_g,
            total_carbs_g: row.total_carbs_g,
            total_fat_g: row.total_fat_g,
            meal_count: row.meal_count,
        }
    }
}

/// First and last calendar day of a month.
pub fn month_range(year: i32, month: u8) -> AppResult<(Date, Date)> {
    let month = Month::try_from(month)
        .map_err(|_| AppError::validation("month must be between 1 and 12"))?;
    let first = Date::from_calendar_date(year, month, 1)
        .map_err(|_| AppError::validation("invalid year"))?;
    let last = Date::from_calendar_date(year, month, time::util::days_in_year_month(year, month))
        .map_err(|_| AppError::validation("invalid year"))?;
    Ok((first, last))
}

/// Expand grouped rows into a dense per-day series over the inclusive range,
/// zero-filling days without meals.
pub fn fill_days(start: Date, end: Date, rows: Vec<DayTotalsRow>) -> Vec<DaySummary> {
    let mut by_date: HashMap<Date, DaySummary> =
        rows.into_iter().map(|r| (r.meal_date, r.into())).collect();

    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(
            by_date
                .remove(&current)
                .unwrap_or_else(|| DaySummary::empty(current)),
        );
        match current.next_day() {
            Some(next) => current = next,
            None => break,
        }
    }
    days
}

pub async fn daily(state: &AppState, user_id: Uuid, date: Date) -> AppResult<DailyNutrition> {
    let key = keys::nutrition_daily(user_id, date);
    if let Some(cached) = cache::get_json::<DailyNutrition>(state.cache.as_ref(), &key).await {
        return Ok(cached);
    }

    let summary = repo::day_totals(&state.db, user_id, date)
        .await?
        .map(DaySummary::from)
        .unwrap_or_else(|| DaySummary::empty(date));
    let goal = profile::repo::daily_calorie_goal(&state.db, user_id).await?;

    let result = DailyNutrition {
        summary,
        daily_calorie_goal: goal,
    };
    cache::put_json(state.cache.as_ref(), &key, &result, state.cache_ttl()).await;
    Ok(result)
}

async fn range_summary(
    state: &AppState,
    user_id: Uuid,
    start: Date,
    end: Date,
    key: String,
) -> AppResult<RangeNutrition> {
    if start > end {
        return Err(AppError::validation("start date must not be after end date"));
    }
    if (end - start).whole_days() >= MAX_RANGE_DAYS {
        return Err(AppError::validation("date range too large"));
    }

    if let Some(cached) = cache::get_json::<RangeNutrition>(state.cache.as_ref(), &key).await {
        return Ok(cached);
    }

    let rows = repo::range_day_totals(&state.db, user_id, start, end).await?;
    let days = fill_days(start, end, rows);
    let total_calories = days.iter().map(|d| d.total_calories).sum();
    let goal = profile::repo::daily_calorie_goal(&state.db, user_id).await?;

    let result = RangeNutrition {
        start_date: start,
        end_date: end,
        days,
        total_calories,
        daily_calorie_goal: goal,
    };
    cache::put_json(state.cache.as_ref(), &key, &result, state.cache_ttl()).await;
    Ok(result)
}

pub async fn weekly(
    state: &AppState,
    user_id: Uuid,
    start: Date,
    end: Date,
) -> AppResult<RangeNutrition> {
    let key = keys::nutrition_weekly(user_id, start, end);
    range_summary(state, user_id, start, end, key).await
}

pub async fn monthly(
    state: &AppState,
    user_id: Uuid,
    year: i32,
    month: u8,
) -> AppResult<RangeNutrition> {
    let (start, end) = month_range(year, month)?;
    let key = keys::nutrition_monthly(user_id, year, month);
    range_summary(state, user_id, start, end, key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(meal_date: Date, calories: f64, count: i64) -> DayTotalsRow {
        DayTotalsRow {
            meal_date,
            total_calories: calories,
            total_protein_g: 0.0,
            total_carbs_g: 0.0,
            total_fat_g: 0.0,
            meal_count: count,
        }
    }

    #[test]
    fn month_range_covers_whole_month() {
        let (start, end) = month_range(2024, 1).unwrap();
        assert_eq!(start, date!(2024 - 01 - 01));
        assert_eq!(end, date!(2024 - 01 - 31));
    }

    #[test]
    fn month_range_handles_leap_february() {
        let (_, end) = month_range(2024, 2).unwrap();
        assert_eq!(end, date!(2024 - 02 - 29));
        let (_, end) = month_range(2023, 2).unwrap();
        assert_eq!(end, date!(2023 - 02 - 28));
    }

    #[test]
    fn month_range_rejects_month_zero_and_thirteen() {
        assert!(month_range(2024, 0).is_err());
        assert!(month_range(2024, 13).is_err());
    }

    #[test]
    fn fill_days_zero_fills_gaps() {
        let start = date!(2024 - 01 - 08);
        let end = date!(2024 - 01 - 14);
        let rows = vec![
            row(date!(2024 - 01 - 10), 160.5, 1),
            row(date!(2024 - 01 - 12), 900.0, 3),
        ];

        let days = fill_days(start, end, rows);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], DaySummary::empty(start));
        assert!((days[2].total_calories - 160.5).abs() < 1e-9);
        assert_eq!(days[2].meal_count, 1);
        assert!((days[4].total_calories - 900.0).abs() < 1e-9);
        assert_eq!(days[6], DaySummary::empty(end));
    }

    #[test]
    fn fill_days_empty_range_is_all_zero() {
        let days = fill_days(date!(2024 - 01 - 01), date!(2024 - 01 - 03), vec![]);
        assert_eq!(days.len(), 3);
        assert!(days.iter().all(|d| d.total_calories == 0.0 && d.meal_count == 0));
    }
}
