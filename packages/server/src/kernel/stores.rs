//! Persistence seams.
//!
//! Each domain talks to storage through a `Base*Store` trait; the Postgres
//! implementations live in the domains' `data.rs` modules and the in-memory
//! implementations used by tests live in [`super::memory`].

use async_trait::async_trait;

use crate::common::{AppResult, MessageId, SwapId, UserId};
use crate::domains::messages::models::{ConversationSummary, Message};
use crate::domains::swaps::machines::StatusPatch;
use crate::domains::swaps::models::{Swap, SwapRole, SwapStatus};
use crate::domains::users::models::{SkillSide, User, UserFilter};

/// A page of results plus the total match count before paging.
pub type Page<T> = (Vec<T>, u64);

#[async_trait]
pub trait BaseUserStore: Send + Sync {
    async fn insert(&self, user: &User) -> AppResult<()>;

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Lookup by an unexpired reset token.
    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>>;

    /// Full-record save; bumps `updated_at`.
    async fn update(&self, user: &User) -> AppResult<()>;

    /// Flip the presence flag and stamp `last_seen`.
    async fn set_online(&self, id: UserId, is_online: bool) -> AppResult<()>;

    /// Fold `rating` into the running average and bump `total_ratings`.
    async fn apply_rating(&self, id: UserId, rating: i32) -> AppResult<()>;

    async fn increment_total_swaps(&self, id: UserId) -> AppResult<()>;

    async fn delete(&self, id: UserId) -> AppResult<()>;

    /// Filtered listing, online users first, then by rating descending.
    async fn search(&self, filter: &UserFilter, page: u32, limit: u32) -> AppResult<Page<User>>;

    /// How many users list `skill` on the given side (case-insensitive
    /// substring match).
    async fn count_by_skill(&self, skill: &str, side: SkillSide) -> AppResult<u64>;
}

#[async_trait]
pub trait BaseSwapStore: Send + Sync {
    async fn insert(&self, swap: &Swap) -> AppResult<()>;

    async fn find_by_id(&self, id: SwapId) -> AppResult<Option<Swap>>;

    /// Any pending swap between the two users, in either direction.
    async fn find_pending_between(&self, a: UserId, b: UserId) -> AppResult<Option<Swap>>;

    /// Conditional status update: applies `patch` only while the swap's
    /// status is still one of `expected`. Returns the updated record when
    /// this caller won, `None` when a racer got there first.
    async fn update_status_checked(
        &self,
        id: SwapId,
        expected: &[SwapStatus],
        patch: &StatusPatch,
    ) -> AppResult<Option<Swap>>;

    /// Conditional rating write: fills `role`'s rating slot only while the
    /// slot is null and the swap is completed. Returns the updated record
    /// when this caller won, `None` when the slot was already taken.
    async fn set_rating_slot(
        &self,
        id: SwapId,
        role: SwapRole,
        rating: i32,
        review: Option<&str>,
    ) -> AppResult<Option<Swap>>;

    /// Swaps where `user` is requester or provider, newest first.
    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<SwapStatus>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Swap>>;

    /// Remove all swaps involving `user`; returns how many went.
    async fn delete_for_user(&self, user: UserId) -> AppResult<u64>;
}

#[async_trait]
pub trait BaseMessageStore: Send + Sync {
    async fn insert(&self, message: &Message) -> AppResult<()>;

    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>>;

    /// One page of the conversation between `a` and `b`, newest first.
    async fn conversation(
        &self,
        a: UserId,
        b: UserId,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>>;

    /// The caller's most recent conversations with unread counts, ordered by
    /// latest activity.
    async fn recent_conversations(
        &self,
        user: UserId,
        limit: u32,
    ) -> AppResult<Vec<ConversationSummary>>;

    /// Mark everything `from` sent to `to` as read; returns how many flipped.
    async fn mark_read(&self, from: UserId, to: UserId) -> AppResult<u64>;

    /// Total unread messages addressed to `user`.
    async fn unread_count(&self, user: UserId) -> AppResult<u64>;

    /// Total messages `user` sent or received.
    async fn count_for_user(&self, user: UserId) -> AppResult<u64>;

    async fn delete(&self, id: MessageId) -> AppResult<()>;

    /// Remove all messages `user` sent or received; returns how many went.
    async fn delete_for_user(&self, user: UserId) -> AppResult<u64>;

    /// Case-insensitive content search over the caller's messages, optionally
    /// narrowed to one conversation.
    async fn search(
        &self,
        user: UserId,
        query: &str,
        with_user: Option<UserId>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>>;
}
