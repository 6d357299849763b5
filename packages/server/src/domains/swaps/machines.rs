//! Swap state machine.
//!
//! Pure transition logic: given the current swap record, the acting user and
//! the requested action, decide whether the transition is allowed and what
//! should change. No I/O happens here - the decision is a field patch plus
//! post-transition hooks, which `actions.rs` persists (the patch through a
//! conditional store update so concurrent racers get exactly one winner) and
//! feeds to the aggregate updater.

use chrono::{DateTime, Utc};

use crate::common::{AppError, AppResult, UserId};
use crate::domains::swaps::models::{Swap, SwapRole, SwapStatus};

/// Action requested against a swap.
#[derive(Debug, Clone)]
pub enum SwapAction {
    Accept,
    Reject,
    Complete,
    Cancel { reason: Option<String> },
    Rate { rating: i32, review: Option<String> },
}

/// Field changes produced by a status transition.
///
/// Applied through `BaseSwapStore::update_status_checked`, which only writes
/// while the swap is still in one of `expected` - the compare-and-swap that
/// guards against two racers both reading `pending`.
#[derive(Debug, Clone)]
pub struct StatusPatch {
    pub status: SwapStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancellation_reason: Option<String>,
}

impl StatusPatch {
    fn to(status: SwapStatus) -> Self {
        Self {
            status,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
        }
    }
}

/// Post-transition side effects on user aggregates, consumed by
/// [`super::aggregates`] best-effort. Keeping them out of the machine keeps
/// the transition logic independently testable.
#[derive(Debug, Clone, PartialEq)]
pub enum SwapHook {
    /// Bump `total_swaps` on both participants.
    SwapsCompleted {
        requester: UserId,
        provider: UserId,
    },
    /// Fold `rating` into the ratee's running average.
    RatingApplied { ratee: UserId, rating: i32 },
}

/// A decided status transition: which states it may be applied from, the
/// patch to write, and the hooks to fire once the write lands.
#[derive(Debug, Clone)]
pub struct SwapTransition {
    pub expected: Vec<SwapStatus>,
    pub patch: StatusPatch,
    pub hooks: Vec<SwapHook>,
}

/// A decided rating: the rater's role (owning the slot to write) and the
/// aggregate hook for the counterparty.
#[derive(Debug, Clone)]
pub struct RatingDecision {
    pub role: SwapRole,
    pub rating: i32,
    pub review: Option<String>,
    pub hooks: Vec<SwapHook>,
}

/// Outcome of [`decide`].
#[derive(Debug, Clone)]
pub enum SwapDecision {
    Transition(SwapTransition),
    Rating(RatingDecision),
}

/// Decide whether `actor` may apply `action` to `swap`.
///
/// Authorization failures are `Forbidden`, wrong-state attempts are
/// `InvalidState` (carrying the current status), duplicate ratings are
/// `Conflict`. An attempt from a non-applicable state is always an explicit
/// error, never silently ignored.
pub fn decide(swap: &Swap, actor: UserId, action: &SwapAction) -> AppResult<SwapDecision> {
    let role = swap
        .role_of(actor)
        .ok_or_else(|| AppError::Forbidden("Access denied".to_string()))?;

    match action {
        SwapAction::Accept => {
            require_provider(role, "Only the provider can accept a swap")?;
            require_status(swap, SwapStatus::Pending, "Swap is not in pending status")?;
            Ok(SwapDecision::Transition(SwapTransition {
                expected: vec![SwapStatus::Pending],
                patch: StatusPatch::to(SwapStatus::Accepted),
                hooks: vec![],
            }))
        }
        SwapAction::Reject => {
            require_provider(role, "Only the provider can reject a swap")?;
            require_status(swap, SwapStatus::Pending, "Swap is not in pending status")?;
            Ok(SwapDecision::Transition(SwapTransition {
                expected: vec![SwapStatus::Pending],
                patch: StatusPatch::to(SwapStatus::Rejected),
                hooks: vec![],
            }))
        }
        SwapAction::Complete => {
            require_status(
                swap,
                SwapStatus::Accepted,
                "Swap must be accepted before completion",
            )?;
            let mut patch = StatusPatch::to(SwapStatus::Completed);
            patch.completed_at = Some(Utc::now());
            Ok(SwapDecision::Transition(SwapTransition {
                expected: vec![SwapStatus::Accepted],
                patch,
                hooks: vec![SwapHook::SwapsCompleted {
                    requester: swap.requester,
                    provider: swap.provider,
                }],
            }))
        }
        SwapAction::Cancel { reason } => {
            if !matches!(swap.status, SwapStatus::Pending | SwapStatus::Accepted) {
                return Err(AppError::invalid_state(
                    "Swap cannot be cancelled in its current status",
                    swap.status,
                ));
            }
            if let Some(reason) = reason {
                if reason.chars().count() > 200 {
                    return Err(AppError::invalid(
                        "reason",
                        "Cancellation reason cannot be more than 200 characters",
                    ));
                }
            }
            let mut patch = StatusPatch::to(SwapStatus::Cancelled);
            patch.cancelled_at = Some(Utc::now());
            patch.cancelled_by = Some(actor);
            patch.cancellation_reason = reason.clone();
            Ok(SwapDecision::Transition(SwapTransition {
                expected: vec![SwapStatus::Pending, SwapStatus::Accepted],
                patch,
                hooks: vec![],
            }))
        }
        SwapAction::Rate { rating, review } => {
            require_status(swap, SwapStatus::Completed, "Can only rate completed swaps")?;
            if !(1..=5).contains(rating) {
                return Err(AppError::invalid(
                    "rating",
                    "Rating must be between 1 and 5",
                ));
            }
            if let Some(review) = review {
                if review.chars().count() > 500 {
                    return Err(AppError::invalid(
                        "review",
                        "Review cannot be more than 500 characters",
                    ));
                }
            }
            // Ratings are 1-5, so a null slot always means "not yet rated".
            if swap.rating_of(role).is_some() {
                return Err(AppError::Conflict(
                    "You have already rated this swap".to_string(),
                ));
            }
            Ok(SwapDecision::Rating(RatingDecision {
                role,
                rating: *rating,
                review: review.clone(),
                hooks: vec![SwapHook::RatingApplied {
                    ratee: swap.counterparty_of(role),
                    rating: *rating,
                }],
            }))
        }
    }
}

fn require_provider(role: SwapRole, message: &str) -> AppResult<()> {
    if role != SwapRole::Provider {
        return Err(AppError::Forbidden(message.to_string()));
    }
    Ok(())
}

fn require_status(swap: &Swap, expected: SwapStatus, message: &str) -> AppResult<()> {
    if swap.status != expected {
        return Err(AppError::invalid_state(message, swap.status));
    }
    Ok(())
}
