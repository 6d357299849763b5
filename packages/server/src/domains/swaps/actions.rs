//! Swap use-cases: create, list, transition, rate.

use serde::Deserialize;
use chrono::{DateTime, Utc};

use crate::common::{AppError, AppResult, SwapId, UserId};
use crate::domains::swaps::aggregates;
use crate::domains::swaps::machines::{self, SwapAction, SwapDecision};
use crate::domains::swaps::models::{Swap, SwapStatus, SwapView};
use crate::domains::users::models::User;
use crate::kernel::ServerDeps;

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 480;
pub const DEFAULT_DURATION_MINUTES: i32 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub provider: UserId,
    pub requested_skill: String,
    pub offered_skill: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub is_remote: bool,
}

async fn load_participant(deps: &ServerDeps, id: UserId) -> AppResult<User> {
    deps.users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

async fn build_view(deps: &ServerDeps, swap: &Swap) -> AppResult<SwapView> {
    let requester = load_participant(deps, swap.requester).await?;
    let provider = load_participant(deps, swap.provider).await?;
    Ok(SwapView::new(swap, &requester, &provider))
}

pub async fn create_swap(
    deps: &ServerDeps,
    actor: UserId,
    request: CreateSwapRequest,
) -> AppResult<SwapView> {
    if request.provider == actor {
        return Err(AppError::invalid(
            "provider",
            "You cannot create a swap with yourself",
        ));
    }
    if request.requested_skill.trim().is_empty() {
        return Err(AppError::invalid("requestedSkill", "Requested skill is required"));
    }
    if request.offered_skill.trim().is_empty() {
        return Err(AppError::invalid("offeredSkill", "Offered skill is required"));
    }
    let message = request.message.as_deref().unwrap_or("").trim().to_string();
    if message.chars().count() > 1000 {
        return Err(AppError::invalid(
            "message",
            "Message cannot be more than 1000 characters",
        ));
    }
    let duration = request.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration) {
        return Err(AppError::invalid(
            "duration",
            "Duration must be between 15 and 480 minutes",
        ));
    }

    let provider = load_participant(deps, request.provider).await?;
    if !provider.offers_skill(request.requested_skill.trim()) {
        return Err(AppError::invalid(
            "requestedSkill",
            "This user does not offer the requested skill",
        ));
    }
    let requester = load_participant(deps, actor).await?;
    if !requester.offers_skill(request.offered_skill.trim()) {
        return Err(AppError::invalid(
            "offeredSkill",
            "You do not offer the skill you are trying to swap",
        ));
    }

    if deps
        .swaps
        .find_pending_between(actor, request.provider)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "You already have a pending swap request with this user".to_string(),
        ));
    }

    let now = Utc::now();
    let swap = Swap {
        id: SwapId::new(),
        requester: actor,
        provider: request.provider,
        requested_skill: request.requested_skill.trim().to_string(),
        offered_skill: request.offered_skill.trim().to_string(),
        status: SwapStatus::Pending,
        message,
        scheduled_date: request.scheduled_date,
        location: request.location,
        duration,
        is_remote: request.is_remote,
        requester_rating: None,
        provider_rating: None,
        requester_review: None,
        provider_review: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        created_at: now,
        updated_at: now,
    };
    deps.swaps.insert(&swap).await?;
    build_view(deps, &swap).await
}

pub async fn get_swap(deps: &ServerDeps, actor: UserId, id: SwapId) -> AppResult<SwapView> {
    let swap = deps
        .swaps
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Swap".to_string()))?;
    if !swap.is_participant(actor) {
        return Err(AppError::Forbidden("Access denied".to_string()));
    }
    build_view(deps, &swap).await
}

pub async fn list_swaps(
    deps: &ServerDeps,
    actor: UserId,
    status: Option<SwapStatus>,
    page: u32,
    limit: u32,
) -> AppResult<(Vec<SwapView>, u64)> {
    let (swaps, total) = deps.swaps.list_for_user(actor, status, page, limit).await?;
    let mut views = Vec::with_capacity(swaps.len());
    for swap in &swaps {
        views.push(build_view(deps, swap).await?);
    }
    Ok((views, total))
}

/// Apply `action` to the swap as `actor`.
///
/// Status changes go through the store's conditional update, so of two
/// concurrent racers exactly one wins; the loser gets an `InvalidState`
/// carrying the status the winner left behind (or `Conflict` for a rating
/// slot that just got taken).
pub async fn apply_action(
    deps: &ServerDeps,
    actor: UserId,
    id: SwapId,
    action: SwapAction,
) -> AppResult<SwapView> {
    let swap = deps
        .swaps
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Swap".to_string()))?;

    let decision = machines::decide(&swap, actor, &action)?;
    let updated = match decision {
        SwapDecision::Transition(transition) => {
            let updated = deps
                .swaps
                .update_status_checked(id, &transition.expected, &transition.patch)
                .await?;
            match updated {
                Some(updated) => {
                    aggregates::apply_hooks(deps, &transition.hooks).await;
                    updated
                }
                None => return Err(lost_race(deps, id).await?),
            }
        }
        SwapDecision::Rating(rating) => {
            let updated = deps
                .swaps
                .set_rating_slot(id, rating.role, rating.rating, rating.review.as_deref())
                .await?;
            match updated {
                Some(updated) => {
                    aggregates::apply_hooks(deps, &rating.hooks).await;
                    updated
                }
                None => {
                    // Either the swap left `completed` or the slot was just
                    // taken by a duplicate submission.
                    let current = deps
                        .swaps
                        .find_by_id(id)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Swap".to_string()))?;
                    if current.status != SwapStatus::Completed {
                        return Err(AppError::invalid_state(
                            "Can only rate completed swaps",
                            current.status,
                        ));
                    }
                    return Err(AppError::Conflict(
                        "You have already rated this swap".to_string(),
                    ));
                }
            }
        }
    };
    build_view(deps, &updated).await
}

/// The conditional update wrote nothing: report the status a concurrent
/// writer left the swap in.
async fn lost_race(deps: &ServerDeps, id: SwapId) -> AppResult<AppError> {
    let current = deps
        .swaps
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Swap".to_string()))?;
    Ok(AppError::invalid_state(
        "Swap status changed concurrently",
        current.status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::auth::jwt::JwtService;
    use std::sync::Arc;

    fn deps() -> ServerDeps {
        ServerDeps::in_memory(Arc::new(JwtService::new(
            "test_secret",
            "test_issuer".to_string(),
            1,
        )))
    }

    async fn seed_user(deps: &ServerDeps, name: &str, offers: &[&str]) -> UserId {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: String::new(),
            avatar: None,
            location: "Berlin".to_string(),
            bio: String::new(),
            skills_offered: offers.iter().map(|s| s.to_string()).collect(),
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
        user.id
    }

    fn request(provider: UserId) -> CreateSwapRequest {
        CreateSwapRequest {
            provider,
            requested_skill: "Piano".to_string(),
            offered_skill: "Guitar".to_string(),
            message: Some("Trade lessons?".to_string()),
            scheduled_date: None,
            location: None,
            duration: None,
            is_remote: true,
        }
    }

    #[tokio::test]
    async fn test_create_swap_rejects_self() {
        let deps = deps();
        let user = seed_user(&deps, "Ada", &["Piano"]).await;
        let err = create_swap(&deps, user, request(user)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_swap_requires_provider_to_offer_skill() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Cooking"]).await;
        let err = create_swap(&deps, requester, request(provider))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_swap_requires_requester_to_offer_skill() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &[]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;
        let err = create_swap(&deps, requester, request(provider))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_swap_message_is_optional() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;

        let mut no_message = request(provider);
        no_message.message = None;
        let view = create_swap(&deps, requester, no_message).await.unwrap();
        assert_eq!(view.message, "");
    }

    #[tokio::test]
    async fn test_swap_message_limit_counts_characters() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;

        let mut over = request(provider);
        over.message = Some("ü".repeat(1001));
        let err = create_swap(&deps, requester, over).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // 1000 multibyte characters are exactly at the limit.
        let mut at_limit = request(provider);
        at_limit.message = Some("ü".repeat(1000));
        create_swap(&deps, requester, at_limit).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_pending_swap_is_conflict() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;

        create_swap(&deps, requester, request(provider)).await.unwrap();
        let err = create_swap(&deps, requester, request(provider))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The reverse direction is blocked by the same pending swap.
        let mut reverse = request(requester);
        reverse.requested_skill = "Guitar".to_string();
        reverse.offered_skill = "Piano".to_string();
        let err = create_swap(&deps, provider, reverse).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_full_lifecycle_updates_aggregates() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;

        let view = create_swap(&deps, requester, request(provider)).await.unwrap();
        let id = view.id;

        apply_action(&deps, provider, id, SwapAction::Accept).await.unwrap();
        apply_action(&deps, requester, id, SwapAction::Complete).await.unwrap();

        let stored = deps.users.find_by_id(provider).await.unwrap().unwrap();
        assert_eq!(stored.total_swaps, 1);

        apply_action(
            &deps,
            requester,
            id,
            SwapAction::Rate {
                rating: 5,
                review: Some("great teacher".to_string()),
            },
        )
        .await
        .unwrap();
        apply_action(
            &deps,
            provider,
            id,
            SwapAction::Rate {
                rating: 4,
                review: None,
            },
        )
        .await
        .unwrap();

        let provider_user = deps.users.find_by_id(provider).await.unwrap().unwrap();
        assert_eq!(provider_user.total_ratings, 1);
        assert_eq!(provider_user.average_rating(), 5.0);
        let requester_user = deps.users.find_by_id(requester).await.unwrap().unwrap();
        assert_eq!(requester_user.average_rating(), 4.0);
    }

    #[tokio::test]
    async fn test_double_accept_second_caller_sees_current_status() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;
        let view = create_swap(&deps, requester, request(provider)).await.unwrap();

        apply_action(&deps, provider, view.id, SwapAction::Accept).await.unwrap();
        let err = apply_action(&deps, provider, view.id, SwapAction::Accept)
            .await
            .unwrap_err();
        match err {
            AppError::InvalidState { current, .. } => assert_eq!(current, "accepted"),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_accepts_have_one_winner() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;
        let view = create_swap(&deps, requester, request(provider)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let deps = deps.clone();
            let id = view.id;
            handles.push(tokio::spawn(async move {
                apply_action(&deps, provider, id, SwapAction::Accept).await
            }));
        }
        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_third_party_cannot_read_or_act() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;
        let outsider = seed_user(&deps, "Eve", &[]).await;
        let view = create_swap(&deps, requester, request(provider)).await.unwrap();

        assert!(matches!(
            get_swap(&deps, outsider, view.id).await.unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            apply_action(&deps, outsider, view.id, SwapAction::Accept)
                .await
                .unwrap_err(),
            AppError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn test_list_swaps_filters_by_status() {
        let deps = deps();
        let requester = seed_user(&deps, "Ada", &["Guitar"]).await;
        let provider = seed_user(&deps, "Grace", &["Piano"]).await;
        let view = create_swap(&deps, requester, request(provider)).await.unwrap();
        apply_action(&deps, provider, view.id, SwapAction::Accept).await.unwrap();

        let (pending, _) = list_swaps(&deps, requester, Some(SwapStatus::Pending), 1, 10)
            .await
            .unwrap();
        assert!(pending.is_empty());
        let (accepted, total) = list_swaps(&deps, requester, Some(SwapStatus::Accepted), 1, 10)
            .await
            .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(total, 1);
    }
}
