//! Cache invalidation policy.
//!
//! Couples meal-aggregate and profile writes to cache deletions. Callers run
//! these **after** the store transaction commits; invalidating first and then
//! failing the write would leave correct data uncached and stale data
//! unreachable, which is strictly worse than transient staleness bounded by
//! the TTL. Application is best-effort: failures are logged, never propagated.

use time::Date;
use tracing::warn;
use uuid::Uuid;

use super::{keys, CacheStore};

/// One deletion the policy has decided on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(String),
    Pattern(String),
}

/// Plan for a meal create: the day's summary plus every cached meal list
/// (membership just changed).
pub fn meal_created(user_id: Uuid, meal_date: Date) -> Vec<Invalidation> {
    vec![
        Invalidation::Key(keys::nutrition_daily(user_id, meal_date)),
        Invalidation::Pattern(keys::user_meals_pattern(user_id)),
    ]
}

/// Plan for a meal update, delete, or food-line removal. `new_date` is only
/// present when an update moved the meal to a different day; both days'
/// summaries are then stale.
pub fn meal_changed(
    meal_id: Uuid,
    user_id: Uuid,
    old_date: Date,
    new_date: Option<Date>,
) -> Vec<Invalidation> {
    let mut plan = vec![
        Invalidation::Key(keys::meal(meal_id, user_id)),
        Invalidation::Pattern(keys::user_meals_pattern(user_id)),
        Invalidation::Key(keys::nutrition_daily(user_id, old_date)),
    ];
    if let Some(new_date) = new_date {
        if new_date != old_date {
            plan.push(Invalidation::Key(keys::nutrition_daily(user_id, new_date)));
        }
    }
    plan
}

/// Plan for a calorie-goal change: the goal is embedded in every cached
/// summary payload, so all of them go.
pub fn goal_changed(user_id: Uuid) -> Vec<Invalidation> {
    vec![
        Invalidation::Pattern(keys::nutrition_daily_pattern(user_id)),
        Invalidation::Pattern(keys::nutrition_weekly_pattern(user_id)),
        Invalidation::Pattern(keys::nutrition_monthly_pattern(user_id)),
    ]
}

/// Apply a plan against the cache. Weekly and monthly summaries covering a
/// changed day are not targeted by meal-write plans and age out via TTL.
pub async fn apply(cache: &dyn CacheStore, plan: &[Invalidation]) {
    for step in plan {
        let result = match step {
            Invalidation::Key(key) => cache.delete(key).await,
            Invalidation::Pattern(pattern) => cache.delete_by_pattern(pattern).await.map(|_| ()),
        };
        if let Err(e) = result {
            warn!(step = ?step, error = %e, "cache invalidation failed, entry will age out via ttl");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn create_plan_targets_day_summary_and_lists() {
        let user = Uuid::new_v4();
        let plan = meal_created(user, date!(2024 - 01 - 10));
        assert!(plan.contains(&Invalidation::Key(format!(
            "nutrition:daily:{user}:2024-01-10"
        ))));
        assert!(plan.contains(&Invalidation::Pattern(format!("meals:user:{user}:*"))));
    }

    #[test]
    fn date_change_invalidates_both_days() {
        let user = Uuid::new_v4();
        let meal = Uuid::new_v4();
        let plan = meal_changed(
            meal,
            user,
            date!(2024 - 01 - 10),
            Some(date!(2024 - 01 - 11)),
        );
        assert!(plan.contains(&Invalidation::Key(format!(
            "nutrition:daily:{user}:2024-01-10"
        ))));
        assert!(plan.contains(&Invalidation::Key(format!(
            "nutrition:daily:{user}:2024-01-11"
        ))));
    }

    #[test]
    fn unchanged_date_invalidates_one_day() {
        let user = Uuid::new_v4();
        let plan = meal_changed(
            Uuid::new_v4(),
            user,
            date!(2024 - 01 - 10),
            Some(date!(2024 - 01 - 10)),
        );
        let daily_steps = plan
            .iter()
            .filter(|s| matches!(s, Invalidation::Key(k) if k.starts_with("nutrition:daily:")))
            .count();
        assert_eq!(daily_steps, 1);
    }

    #[tokio::test]
    async fn applying_a_date_change_clears_both_cached_summaries() {
        use crate::cache::MemoryCache;
        use std::time::Duration;

        let cache = MemoryCache::new();
        let user = Uuid::new_v4();
        let meal = Uuid::new_v4();
        let ttl = Duration::from_secs(60);
        let d1 = date!(2024 - 01 - 10);
        let d2 = date!(2024 - 01 - 11);

        cache
            .set(&keys::nutrition_daily(user, d1), "{}", ttl)
            .await
            .unwrap();
        cache
            .set(&keys::nutrition_daily(user, d2), "{}", ttl)
            .await
            .unwrap();
        cache
            .set(&keys::user_meals(user, 20, 0, None), "[]", ttl)
            .await
            .unwrap();

        let plan = meal_changed(meal, user, d1, Some(d2));
        apply(&cache, &plan).await;

        assert_eq!(cache.get(&keys::nutrition_daily(user, d1)).await.unwrap(), None);
        assert_eq!(cache.get(&keys::nutrition_daily(user, d2)).await.unwrap(), None);
        assert_eq!(
            cache.get(&keys::user_meals(user, 20, 0, None)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn goal_change_clears_all_summary_granularities() {
        use crate::cache::MemoryCache;
        use std::time::Duration;

        let cache = MemoryCache::new();
        let user = Uuid::new_v4();
        let ttl = Duration::from_secs(60);
        cache
            .set(&keys::nutrition_daily(user, date!(2024 - 01 - 10)), "{}", ttl)
            .await
            .unwrap();
        cache
            .set(
                &keys::nutrition_weekly(user, date!(2024 - 01 - 08), date!(2024 - 01 - 14)),
                "{}",
                ttl,
            )
            .await
            .unwrap();
        cache
            .set(&keys::nutrition_monthly(user, 2024, 1), "{}", ttl)
            .await
            .unwrap();

        apply(&cache, &goal_changed(user)).await;

        assert_eq!(
            cache
                .get(&keys::nutrition_daily(user, date!(2024 - 01 - 10)))
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            cache.get(&keys::nutrition_monthly(user, 2024, 1)).await.unwrap(),
            None
        );
    }
}
