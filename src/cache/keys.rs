//! Cache key builders. The only place key layouts are spelled out, so the
//! invalidation policy and the read paths can never drift apart.

use time::Date;
use uuid::Uuid;

use crate::dates::format_date;

pub fn meal(meal_id: Uuid, user_id: Uuid) -> String {
    format!("meals:id:{meal_id}:{user_id}")
}

pub fn user_meals(user_id: Uuid, limit: i64, offset: i64, date: Option<Date>) -> String {
    let date = date.map(format_date).unwrap_or_else(|| "all".into());
    format!("meals:user:{user_id}:{date}:{limit}:{offset}")
}

/// Glob matching every cached meal list for a user. List caches depend on
/// membership, so any meal write drops them all.
pub fn user_meals_pattern(user_id: Uuid) -> String {
    format!("meals:user:{user_id}:*")
}

pub fn nutrition_daily(user_id: Uuid, date: Date) -> String {
    format!("nutrition:daily:{user_id}:{}", format_date(date))
}

pub fn nutrition_daily_pattern(user_id: Uuid) -> String {
    format!("nutrition:daily:{user_id}:*")
}

pub fn nutrition_weekly(user_id: Uuid, start: Date, end: Date) -> String {
    format!(
        "nutrition:weekly:{user_id}:{}:{}",
        format_date(start),
        format_date(end)
    )
}

pub fn nutrition_weekly_pattern(user_id: Uuid) -> String {
    format!("nutrition:weekly:{user_id}:*")
}

pub fn nutrition_monthly(user_id: Uuid, year: i32, month: u8) -> String {
    format!("nutrition:monthly:{user_id}:{year}-{month:02}")
}

pub fn nutrition_monthly_pattern(user_id: Uuid) -> String {
    format!("nutrition:monthly:{user_id}:*")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn daily_key_embeds_user_and_date() {
        let user = Uuid::nil();
        assert_eq!(
            nutrition_daily(user, date!(2024 - 01 - 10)),
            format!("nutrition:daily:{user}:2024-01-10")
        );
    }

    #[test]
    fn list_key_matches_list_pattern() {
        let user = Uuid::new_v4();
        let key = user_meals(user, 20, 0, None);
        let pattern = user_meals_pattern(user);
        let prefix = pattern.strip_suffix('*').unwrap();
        assert!(key.starts_with(prefix));
    }

    #[test]
    fn monthly_key_zero_pads_month() {
        let user = Uuid::nil();
        assert_eq!(
            nutrition_monthly(user, 2024, 3),
            format!("nutrition:monthly:{user}:2024-03")
        );
    }
}
