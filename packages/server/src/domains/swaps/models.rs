use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{SwapId, UserId};
use crate::domains::users::models::User;

/// Swap lifecycle status.
///
/// `pending -> {accepted, rejected}`, `accepted -> {completed, cancelled}`,
/// `pending -> cancelled`; `rejected`/`completed`/`cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "swap_status", rename_all = "lowercase")]
pub enum SwapStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapStatus::Rejected | SwapStatus::Completed | SwapStatus::Cancelled
        )
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwapStatus::Pending => write!(f, "pending"),
            SwapStatus::Accepted => write!(f, "accepted"),
            SwapStatus::Rejected => write!(f, "rejected"),
            SwapStatus::Completed => write!(f, "completed"),
            SwapStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SwapStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(SwapStatus::Pending),
            "accepted" => Ok(SwapStatus::Accepted),
            "rejected" => Ok(SwapStatus::Rejected),
            "completed" => Ok(SwapStatus::Completed),
            "cancelled" => Ok(SwapStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid swap status: {}", s)),
        }
    }
}

/// Which side of a swap a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapRole {
    Requester,
    Provider,
}

/// Swap - a negotiated exchange of one skill for another between two users.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Swap {
    pub id: SwapId,
    pub requester: UserId,
    pub provider: UserId,
    pub requested_skill: String,
    pub offered_skill: String,
    pub status: SwapStatus,
    pub message: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    /// Minutes.
    pub duration: i32,
    pub is_remote: bool,
    pub requester_rating: Option<i32>,
    pub provider_rating: Option<i32>,
    pub requester_review: Option<String>,
    pub provider_review: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    /// The role `user` holds in this swap, if they are a participant.
    pub fn role_of(&self, user: UserId) -> Option<SwapRole> {
        if user == self.requester {
            Some(SwapRole::Requester)
        } else if user == self.provider {
            Some(SwapRole::Provider)
        } else {
            None
        }
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.role_of(user).is_some()
    }

    /// The counterparty of `role` (the user the rater is rating).
    pub fn counterparty_of(&self, role: SwapRole) -> UserId {
        match role {
            SwapRole::Requester => self.provider,
            SwapRole::Provider => self.requester,
        }
    }

    /// The rating slot owned by `role`.
    pub fn rating_of(&self, role: SwapRole) -> Option<i32> {
        match role {
            SwapRole::Requester => self.requester_rating,
            SwapRole::Provider => self.provider_rating,
        }
    }
}

/// Embedded participant summary on swap views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParticipant {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
    pub location: String,
}

impl From<&User> for SwapParticipant {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
            location: user.location.clone(),
        }
    }
}

/// Wire representation of a swap with populated participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapView {
    pub id: SwapId,
    pub requester: SwapParticipant,
    pub provider: SwapParticipant,
    pub requested_skill: String,
    pub offered_skill: String,
    pub status: SwapStatus,
    pub message: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub duration: i32,
    pub is_remote: bool,
    pub requester_rating: Option<i32>,
    pub provider_rating: Option<i32>,
    pub requester_review: Option<String>,
    pub provider_review: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SwapView {
    pub fn new(swap: &Swap, requester: &User, provider: &User) -> Self {
        Self {
            id: swap.id,
            requester: SwapParticipant::from(requester),
            provider: SwapParticipant::from(provider),
            requested_skill: swap.requested_skill.clone(),
            offered_skill: swap.offered_skill.clone(),
            status: swap.status,
            message: swap.message.clone(),
            scheduled_date: swap.scheduled_date,
            location: swap.location.clone(),
            duration: swap.duration,
            is_remote: swap.is_remote,
            requester_rating: swap.requester_rating,
            provider_rating: swap.provider_rating,
            requester_review: swap.requester_review.clone(),
            provider_review: swap.provider_review.clone(),
            completed_at: swap.completed_at,
            cancelled_at: swap.cancelled_at,
            cancelled_by: swap.cancelled_by,
            cancellation_reason: swap.cancellation_reason.clone(),
            created_at: swap.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!SwapStatus::Pending.is_terminal());
        assert!(!SwapStatus::Accepted.is_terminal());
        assert!(SwapStatus::Rejected.is_terminal());
        assert!(SwapStatus::Completed.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_display_fromstr_roundtrip() {
        for status in [
            SwapStatus::Pending,
            SwapStatus::Accepted,
            SwapStatus::Rejected,
            SwapStatus::Completed,
            SwapStatus::Cancelled,
        ] {
            let parsed: SwapStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
