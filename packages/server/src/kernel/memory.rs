//! In-memory store implementations.
//!
//! Back the `Base*Store` traits with hash maps behind async locks. Used by
//! the integration tests and anywhere a handler needs exercising without a
//! database. The conditional operations (`update_status_checked`,
//! `set_rating_slot`) do their check and write inside one critical section,
//! matching the single-statement guarantee of the Postgres versions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::common::{AppResult, MessageId, SwapId, UserId};
use crate::domains::messages::models::{ConversationSummary, Message};
use crate::domains::swaps::machines::StatusPatch;
use crate::domains::swaps::models::{Swap, SwapRole, SwapStatus};
use crate::domains::users::models::{SkillSide, User, UserFilter};
use crate::kernel::stores::{BaseMessageStore, BaseSwapStore, BaseUserStore, Page};

fn page_slice<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let start = (page.saturating_sub(1) as usize) * limit as usize;
    items
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect()
}

#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn any_contains_ci(list: &[String], needle: &str) -> bool {
    list.iter().any(|s| contains_ci(s, needle))
}

fn matches_filter(user: &User, filter: &UserFilter) -> bool {
    if filter.exclude == Some(user.id) {
        return false;
    }
    if let Some(search) = &filter.search {
        let hit = contains_ci(&user.name, search)
            || contains_ci(&user.location, search)
            || any_contains_ci(&user.skills_offered, search)
            || any_contains_ci(&user.skills_wanted, search);
        if !hit {
            return false;
        }
    }
    if let Some(location) = &filter.location {
        if !contains_ci(&user.location, location) {
            return false;
        }
    }
    if let Some(skill) = &filter.skill {
        if !any_contains_ci(&user.skills_offered, skill)
            && !any_contains_ci(&user.skills_wanted, skill)
        {
            return false;
        }
    }
    if let Some(availability) = &filter.availability {
        if &user.availability != availability {
            return false;
        }
    }
    if let Some(min_rating) = filter.min_rating {
        if user.rating < min_rating {
            return false;
        }
    }
    true
}

#[async_trait]
impl BaseUserStore for InMemoryUserStore {
    async fn insert(&self, user: &User) -> AppResult<()> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> AppResult<Option<User>> {
        let now = Utc::now();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token)
                    && u.reset_password_expires.map(|e| e > now).unwrap_or(false)
            })
            .cloned())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut saved = user.clone();
        saved.updated_at = Utc::now();
        self.users.write().await.insert(saved.id, saved);
        Ok(())
    }

    async fn set_online(&self, id: UserId, is_online: bool) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_online = is_online;
            user.last_seen = Utc::now();
        }
        Ok(())
    }

    async fn apply_rating(&self, id: UserId, rating: i32) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            let total = user.total_ratings as f64;
            user.rating = (user.rating * total + rating as f64) / (total + 1.0);
            user.total_ratings += 1;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_total_swaps(&self, id: UserId) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.total_swaps += 1;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: UserId) -> AppResult<()> {
        self.users.write().await.remove(&id);
        Ok(())
    }

    async fn search(&self, filter: &UserFilter, page: u32, limit: u32) -> AppResult<Page<User>> {
        let users = self.users.read().await;
        let mut matched: Vec<User> = users
            .values()
            .filter(|u| matches_filter(u, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.is_online
                .cmp(&a.is_online)
                .then(b.last_seen.cmp(&a.last_seen))
                .then(a.id.cmp(&b.id))
        });
        let total = matched.len() as u64;
        Ok((page_slice(&matched, page, limit), total))
    }

    async fn count_by_skill(&self, skill: &str, side: SkillSide) -> AppResult<u64> {
        let users = self.users.read().await;
        let hit = |list: &[String]| any_contains_ci(list, skill);
        Ok(users
            .values()
            .filter(|u| match side {
                SkillSide::Offered => hit(&u.skills_offered),
                SkillSide::Wanted => hit(&u.skills_wanted),
                SkillSide::Either => hit(&u.skills_offered) || hit(&u.skills_wanted),
            })
            .count() as u64)
    }
}

#[derive(Default, Clone)]
pub struct InMemorySwapStore {
    swaps: Arc<RwLock<HashMap<SwapId, Swap>>>,
}

impl InMemorySwapStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseSwapStore for InMemorySwapStore {
    async fn insert(&self, swap: &Swap) -> AppResult<()> {
        self.swaps.write().await.insert(swap.id, swap.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SwapId) -> AppResult<Option<Swap>> {
        Ok(self.swaps.read().await.get(&id).cloned())
    }

    async fn find_pending_between(&self, a: UserId, b: UserId) -> AppResult<Option<Swap>> {
        Ok(self
            .swaps
            .read()
            .await
            .values()
            .find(|s| {
                s.status == SwapStatus::Pending
                    && ((s.requester == a && s.provider == b)
                        || (s.requester == b && s.provider == a))
            })
            .cloned())
    }

    async fn update_status_checked(
        &self,
        id: SwapId,
        expected: &[SwapStatus],
        patch: &StatusPatch,
    ) -> AppResult<Option<Swap>> {
        let mut swaps = self.swaps.write().await;
        let Some(swap) = swaps.get_mut(&id) else {
            return Ok(None);
        };
        if !expected.contains(&swap.status) {
            return Ok(None);
        }
        swap.status = patch.status;
        swap.completed_at = patch.completed_at.or(swap.completed_at);
        swap.cancelled_at = patch.cancelled_at.or(swap.cancelled_at);
        swap.cancelled_by = patch.cancelled_by.or(swap.cancelled_by);
        if patch.cancellation_reason.is_some() {
            swap.cancellation_reason = patch.cancellation_reason.clone();
        }
        swap.updated_at = Utc::now();
        Ok(Some(swap.clone()))
    }

    async fn set_rating_slot(
        &self,
        id: SwapId,
        role: SwapRole,
        rating: i32,
        review: Option<&str>,
    ) -> AppResult<Option<Swap>> {
        let mut swaps = self.swaps.write().await;
        let Some(swap) = swaps.get_mut(&id) else {
            return Ok(None);
        };
        if swap.status != SwapStatus::Completed || swap.rating_of(role).is_some() {
            return Ok(None);
        }
        match role {
            SwapRole::Requester => {
                swap.requester_rating = Some(rating);
                swap.requester_review = review.map(|r| r.to_string());
            }
            SwapRole::Provider => {
                swap.provider_rating = Some(rating);
                swap.provider_review = review.map(|r| r.to_string());
            }
        }
        swap.updated_at = Utc::now();
        Ok(Some(swap.clone()))
    }

    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<SwapStatus>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Swap>> {
        let swaps = self.swaps.read().await;
        let mut matched: Vec<Swap> = swaps
            .values()
            .filter(|s| s.is_participant(user) && status.map(|st| s.status == st).unwrap_or(true))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len() as u64;
        Ok((page_slice(&matched, page, limit), total))
    }

    async fn delete_for_user(&self, user: UserId) -> AppResult<u64> {
        let mut swaps = self.swaps.write().await;
        let before = swaps.len();
        swaps.retain(|_, s| !s.is_participant(user));
        Ok((before - swaps.len()) as u64)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<MessageId, Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl BaseMessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        self.messages
            .write()
            .await
            .insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>> {
        Ok(self.messages.read().await.get(&id).cloned())
    }

    async fn conversation(
        &self,
        a: UserId,
        b: UserId,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let messages = self.messages.read().await;
        let mut matched: Vec<Message> = messages
            .values()
            .filter(|m| m.belongs_to_conversation(a, b))
            .cloned()
            .collect();
        newest_first(&mut matched);
        let total = matched.len() as u64;
        Ok((page_slice(&matched, page, limit), total))
    }

    async fn recent_conversations(
        &self,
        user: UserId,
        limit: u32,
    ) -> AppResult<Vec<ConversationSummary>> {
        let messages = self.messages.read().await;
        let mut latest: HashMap<UserId, Message> = HashMap::new();
        let mut unread: HashMap<UserId, u64> = HashMap::new();
        for message in messages.values() {
            let other = if message.sender == user {
                message.recipient
            } else if message.recipient == user {
                message.sender
            } else {
                continue;
            };
            if message.recipient == user && !message.is_read {
                *unread.entry(other).or_default() += 1;
            }
            match latest.get(&other) {
                Some(current) if current.created_at >= message.created_at => {}
                _ => {
                    latest.insert(other, message.clone());
                }
            }
        }
        let mut summaries: Vec<ConversationSummary> = latest
            .into_iter()
            .map(|(other, last_message)| ConversationSummary {
                other_user: other,
                unread_count: unread.get(&other).copied().unwrap_or(0),
                last_message,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }

    async fn mark_read(&self, from: UserId, to: UserId) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let now = Utc::now();
        let mut flipped = 0;
        for message in messages.values_mut() {
            if message.sender == from && message.recipient == to && !message.is_read {
                message.is_read = true;
                message.read_at = Some(now);
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn unread_count(&self, user: UserId) -> AppResult<u64> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.recipient == user && !m.is_read)
            .count() as u64)
    }

    async fn count_for_user(&self, user: UserId) -> AppResult<u64> {
        let messages = self.messages.read().await;
        Ok(messages
            .values()
            .filter(|m| m.sender == user || m.recipient == user)
            .count() as u64)
    }

    async fn delete(&self, id: MessageId) -> AppResult<()> {
        self.messages.write().await.remove(&id);
        Ok(())
    }

    async fn delete_for_user(&self, user: UserId) -> AppResult<u64> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|_, m| m.sender != user && m.recipient != user);
        Ok((before - messages.len()) as u64)
    }

    async fn search(
        &self,
        user: UserId,
        query: &str,
        with_user: Option<UserId>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let messages = self.messages.read().await;
        let mut matched: Vec<Message> = messages
            .values()
            .filter(|m| {
                let mine = m.sender == user || m.recipient == user;
                let scoped = match with_user {
                    Some(other) => m.belongs_to_conversation(user, other),
                    None => true,
                };
                mine && scoped && contains_ci(&m.content, query)
            })
            .cloned()
            .collect();
        newest_first(&mut matched);
        let total = matched.len() as u64;
        Ok((page_slice(&matched, page, limit), total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::messages::models::MessageType;

    fn message(sender: UserId, recipient: UserId, content: &str) -> Message {
        Message {
            id: MessageId::new(),
            sender,
            recipient,
            content: content.to_string(),
            message_type: MessageType::Text,
            swap_id: None,
            is_read: false,
            read_at: None,
            attachments: vec![],
            reply_to: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mark_read_only_flips_addressed_unread() {
        let store = InMemoryMessageStore::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        store.insert(&message(a, b, "one")).await.unwrap();
        store.insert(&message(a, b, "two")).await.unwrap();
        store.insert(&message(b, a, "reply")).await.unwrap();
        store.insert(&message(c, b, "other")).await.unwrap();

        assert_eq!(store.mark_read(a, b).await.unwrap(), 2);
        assert_eq!(store.mark_read(a, b).await.unwrap(), 0);
        assert_eq!(store.unread_count(b).await.unwrap(), 1);
        assert_eq!(store.unread_count(a).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_conversations_groups_by_counterparty() {
        let store = InMemoryMessageStore::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        store.insert(&message(b, a, "from b 1")).await.unwrap();
        store.insert(&message(b, a, "from b 2")).await.unwrap();
        store.insert(&message(a, c, "to c")).await.unwrap();

        let summaries = store.recent_conversations(a, 20).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let with_b = summaries.iter().find(|s| s.other_user == b).unwrap();
        assert_eq!(with_b.unread_count, 2);
        let with_c = summaries.iter().find(|s| s.other_user == c).unwrap();
        assert_eq!(with_c.unread_count, 0);
    }

    #[tokio::test]
    async fn test_user_search_orders_online_first() {
        let store = InMemoryUserStore::new();
        let mut offline = crate::domains::users::models::User {
            id: UserId::new(),
            name: "Offline".to_string(),
            email: "offline@example.com".to_string(),
            password_hash: String::new(),
            avatar: None,
            location: "Berlin".to_string(),
            bio: String::new(),
            skills_offered: vec![],
            skills_wanted: vec![],
            availability: "Flexible".to_string(),
            rating: 5.0,
            total_ratings: 10,
            total_swaps: 0,
            is_online: false,
            last_seen: Utc::now(),
            reset_password_token: None,
            reset_password_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.insert(&offline).await.unwrap();
        offline.id = UserId::new();
        offline.name = "Online".to_string();
        offline.email = "online@example.com".to_string();
        offline.rating = 1.0;
        offline.is_online = true;
        store.insert(&offline).await.unwrap();

        let (users, total) = store
            .search(&UserFilter::default(), 1, 10)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(users[0].name, "Online");
    }
}
