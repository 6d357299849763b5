//! Postgres persistence for messages.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{AppResult, MessageId, UserId};
use crate::domains::messages::models::{ConversationSummary, Message};
use crate::kernel::stores::{BaseMessageStore, Page};

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseMessageStore for PgMessageStore {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (
                id, sender, recipient, content, message_type, swap_id,
                is_read, read_at, attachments, reply_to, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(message.id)
        .bind(message.sender)
        .bind(message.recipient)
        .bind(&message.content)
        .bind(message.message_type)
        .bind(message.swap_id)
        .bind(message.is_read)
        .bind(message.read_at)
        .bind(&message.attachments)
        .bind(message.reply_to)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn conversation(
        &self,
        a: UserId,
        b: UserId,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages
             WHERE (sender = $1 AND recipient = $2)
                OR (sender = $2 AND recipient = $1)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(a)
        .bind(b)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages
             WHERE (sender = $1 AND recipient = $2)
                OR (sender = $2 AND recipient = $1)",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok((messages, total as u64))
    }

    async fn recent_conversations(
        &self,
        user: UserId,
        limit: u32,
    ) -> AppResult<Vec<ConversationSummary>> {
        // Latest message per counterparty.
        let latest = sqlx::query_as::<_, Message>(
            "SELECT DISTINCT ON (other) id, sender, recipient, content, message_type,
                    swap_id, is_read, read_at, attachments, reply_to, created_at
             FROM (
                SELECT *, CASE WHEN sender = $1 THEN recipient ELSE sender END AS other
                FROM messages
                WHERE sender = $1 OR recipient = $1
             ) m
             ORDER BY other, created_at DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        let unread: Vec<(UserId, i64)> = sqlx::query_as(
            "SELECT sender, COUNT(*) FROM messages
             WHERE recipient = $1 AND is_read = false
             GROUP BY sender",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        let unread: HashMap<UserId, i64> = unread.into_iter().collect();

        let mut summaries: Vec<ConversationSummary> = latest
            .into_iter()
            .map(|message| {
                let other = if message.sender == user {
                    message.recipient
                } else {
                    message.sender
                };
                ConversationSummary {
                    other_user: other,
                    unread_count: unread.get(&other).copied().unwrap_or(0) as u64,
                    last_message: message,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }

    async fn mark_read(&self, from: UserId, to: UserId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages
             SET is_read = true, read_at = NOW()
             WHERE sender = $1 AND recipient = $2 AND is_read = false",
        )
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_count(&self, user: UserId) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE recipient = $1 AND is_read = false",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(total as u64)
    }

    async fn count_for_user(&self, user: UserId) -> AppResult<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE sender = $1 OR recipient = $1")
                .bind(user)
                .fetch_one(&self.pool)
                .await?;
        Ok(total as u64)
    }

    async fn delete(&self, id: MessageId) -> AppResult<()> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_for_user(&self, user: UserId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE sender = $1 OR recipient = $1")
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn search(
        &self,
        user: UserId,
        query: &str,
        with_user: Option<UserId>,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Message>> {
        let pattern = format!("%{query}%");
        let offset = (page.saturating_sub(1) as i64) * limit as i64;
        let condition = "(sender = $1 OR recipient = $1)
               AND content ILIKE $2
               AND ($3::uuid IS NULL OR sender = $3 OR recipient = $3)";

        let messages = sqlx::query_as::<_, Message>(&format!(
            "SELECT * FROM messages
             WHERE {condition}
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(user)
        .bind(&pattern)
        .bind(with_user)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages WHERE {condition}"))
                .bind(user)
                .bind(&pattern)
                .bind(with_user)
                .fetch_one(&self.pool)
                .await?;

        Ok((messages, total as u64))
    }
}
