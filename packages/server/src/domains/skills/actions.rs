//! Skill catalog queries and per-skill statistics.

use serde::Serialize;

use crate::common::{AppError, AppResult, UserId};
use crate::domains::skills::catalog;
use crate::domains::users::models::{PublicUser, SkillSide, UserFilter};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillStats {
    pub users_offering: u64,
    pub users_wanting: u64,
    pub total_users: u64,
    /// Share of involved users who want the skill, as a percentage rounded
    /// to one decimal.
    pub demand_ratio: f64,
}

pub fn search_skills(query: &str, category: Option<&str>, limit: usize) -> AppResult<Vec<&'static str>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::invalid("q", "Search query is required"));
    }
    Ok(catalog::search(query, category, limit))
}

/// Users listing `skill` on either side, filtered like the main browse.
pub async fn users_by_skill(
    deps: &ServerDeps,
    actor: UserId,
    skill: &str,
    location: Option<String>,
    availability: Option<String>,
    min_rating: Option<f64>,
    page: u32,
    limit: u32,
) -> AppResult<(Vec<PublicUser>, u64)> {
    let filter = UserFilter {
        search: None,
        location,
        skill: Some(skill.to_string()),
        availability,
        min_rating,
        exclude: Some(actor),
    };
    let (users, total) = deps.users.search(&filter, page, limit).await?;
    Ok((users.iter().map(PublicUser::from).collect(), total))
}

pub async fn skill_stats(deps: &ServerDeps, skill: &str) -> AppResult<SkillStats> {
    let users_offering = deps.users.count_by_skill(skill, SkillSide::Offered).await?;
    let users_wanting = deps.users.count_by_skill(skill, SkillSide::Wanted).await?;
    let total_users = deps.users.count_by_skill(skill, SkillSide::Either).await?;
    let demand_ratio = if total_users > 0 {
        (users_wanting as f64 / total_users as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };
    Ok(SkillStats {
        users_offering,
        users_wanting,
        total_users,
        demand_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::actions::{register, RegisterRequest};
    use crate::domains::auth::jwt::JwtService;
    use std::sync::Arc;

    fn deps() -> ServerDeps {
        ServerDeps::in_memory(Arc::new(JwtService::new(
            "test_secret",
            "test_issuer".to_string(),
            1,
        )))
    }

    async fn seed(deps: &ServerDeps, name: &str, offers: &[&str], wants: &[&str]) -> UserId {
        register(
            deps,
            RegisterRequest {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "hunter22".to_string(),
                location: None,
                bio: None,
                skills_offered: offers.iter().map(|s| s.to_string()).collect(),
                skills_wanted: wants.iter().map(|s| s.to_string()).collect(),
                availability: None,
            },
        )
        .await
        .unwrap()
        .user
        .id
    }

    #[tokio::test]
    async fn test_skill_stats_demand_ratio() {
        let deps = deps();
        seed(&deps, "Ada", &["Piano"], &[]).await;
        seed(&deps, "Grace", &[], &["Piano"]).await;
        seed(&deps, "Eve", &[], &["Piano"]).await;
        seed(&deps, "Joan", &["Cooking"], &[]).await;

        let stats = skill_stats(&deps, "Piano").await.unwrap();
        assert_eq!(stats.users_offering, 1);
        assert_eq!(stats.users_wanting, 2);
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.demand_ratio, 66.7);
    }

    #[tokio::test]
    async fn test_stats_for_unknown_skill_are_zero() {
        let deps = deps();
        let stats = skill_stats(&deps, "Juggling").await.unwrap();
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.demand_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_users_by_skill_matches_either_side() {
        let deps = deps();
        let ada = seed(&deps, "Ada", &["Piano"], &[]).await;
        seed(&deps, "Grace", &[], &["Piano"]).await;

        let (users, total) = users_by_skill(&deps, ada, "Piano", None, None, None, 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 1); // the caller is excluded
        assert_eq!(users[0].name, "Grace");
    }

    #[test]
    fn test_search_requires_query() {
        assert!(matches!(
            search_skills("  ", None, 20).unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
