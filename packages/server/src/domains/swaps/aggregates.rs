//! User-aggregate updates driven by swap transitions.
//!
//! Applied best-effort after the swap record has committed: a failure here
//! leaves the counters stale but never rolls back or fails the transition
//! the caller already won.

use tracing::warn;

use crate::domains::swaps::machines::SwapHook;
use crate::kernel::ServerDeps;

pub async fn apply_hooks(deps: &ServerDeps, hooks: &[SwapHook]) {
    for hook in hooks {
        match hook {
            SwapHook::SwapsCompleted { requester, provider } => {
                for user in [requester, provider] {
                    if let Err(error) = deps.users.increment_total_swaps(*user).await {
                        warn!(user_id = %user, %error, "failed to bump total_swaps");
                    }
                }
            }
            SwapHook::RatingApplied { ratee, rating } => {
                if let Err(error) = deps.users.apply_rating(*ratee, *rating).await {
                    warn!(user_id = %ratee, %error, "failed to apply rating");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::UserId;
    use crate::domains::auth::jwt::JwtService;
    use crate::domains::users::models::User;
    use chrono::Utc;
    use std::sync::Arc;

    async fn seeded_deps() -> (ServerDeps, UserId) {
        let deps = ServerDeps::in_memory(Arc::new(JwtService::new(
            "test_secret",
            "test_issuer".to_string(),
            1,
        )));
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            avatar: None,
            location: String::new(),
            bio: String::new(),
            skills_offered: vec![],
            skills_wanted: vec![],
            availability: "Flexible".to_string(),
            rating: 0.0,
            total_ratings: 0,
            total_swaps: 0,
            is_online: false,
            last_seen: now,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        };
        deps.users.insert(&user).await.unwrap();
        (deps, user.id)
    }

    #[tokio::test]
    async fn test_ratings_fold_into_running_average() {
        let (deps, user) = seeded_deps().await;
        for rating in [5, 4, 3] {
            apply_hooks(&deps, &[SwapHook::RatingApplied { ratee: user, rating }]).await;
        }
        let stored = deps.users.find_by_id(user).await.unwrap().unwrap();
        assert_eq!(stored.total_ratings, 3);
        assert_eq!(stored.average_rating(), 4.0);
    }

    #[tokio::test]
    async fn test_missing_user_does_not_panic() {
        let (deps, _) = seeded_deps().await;
        apply_hooks(
            &deps,
            &[SwapHook::RatingApplied {
                ratee: UserId::new(),
                rating: 5,
            }],
        )
        .await;
    }
}
