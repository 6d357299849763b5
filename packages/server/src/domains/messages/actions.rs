//! Messaging use-cases: send, conversations, read receipts, search.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::common::{AppError, AppResult, MessageId, UserId};
use crate::domains::messages::models::{Message, MessageType, MessageView};
use crate::domains::users::models::{PublicUser, User};
use crate::kernel::ServerDeps;

pub const MAX_CONTENT_LENGTH: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient: UserId,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub swap_id: Option<crate::common::SwapId>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
}

/// One recent-conversations entry on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub user: PublicUser,
    pub last_message: MessageView,
    pub unread_count: u64,
}

async fn load_user(deps: &ServerDeps, id: UserId) -> AppResult<User> {
    deps.users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

async fn build_view(deps: &ServerDeps, message: &Message) -> AppResult<MessageView> {
    let sender = load_user(deps, message.sender).await?;
    let recipient = load_user(deps, message.recipient).await?;
    Ok(MessageView::new(message, &sender, &recipient))
}

pub async fn send_message(
    deps: &ServerDeps,
    actor: UserId,
    request: SendMessageRequest,
) -> AppResult<MessageView> {
    if request.recipient == actor {
        return Err(AppError::invalid(
            "recipient",
            "You cannot send a message to yourself",
        ));
    }
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::invalid("content", "Message content is required"));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(AppError::invalid(
            "content",
            "Message cannot be more than 1000 characters",
        ));
    }

    let sender = load_user(deps, actor).await?;
    let recipient = load_user(deps, request.recipient).await?;

    if let Some(reply_to) = request.reply_to {
        let original = deps
            .messages
            .find_by_id(reply_to)
            .await?
            .ok_or_else(|| AppError::NotFound("Message".to_string()))?;
        if !original.belongs_to_conversation(actor, request.recipient) {
            return Err(AppError::invalid(
                "replyTo",
                "Replied-to message is not part of this conversation",
            ));
        }
    }

    let message = Message {
        id: MessageId::new(),
        sender: actor,
        recipient: request.recipient,
        content: content.to_string(),
        message_type: request.message_type.unwrap_or_default(),
        swap_id: request.swap_id,
        is_read: false,
        read_at: None,
        attachments: request.attachments,
        reply_to: request.reply_to,
        created_at: Utc::now(),
    };
    deps.messages.insert(&message).await?;
    Ok(MessageView::new(&message, &sender, &recipient))
}

/// One page of the conversation with `other`, oldest first within the page,
/// newest page first. Fetching a page marks the counterparty's messages as
/// read.
pub async fn get_conversation(
    deps: &ServerDeps,
    actor: UserId,
    other: UserId,
    page: u32,
    limit: u32,
) -> AppResult<(Vec<MessageView>, u64)> {
    load_user(deps, other).await?;
    let (mut messages, total) = deps.messages.conversation(actor, other, page, limit).await?;
    messages.reverse();
    deps.messages.mark_read(other, actor).await?;

    let mut views = Vec::with_capacity(messages.len());
    for message in &messages {
        views.push(build_view(deps, message).await?);
    }
    Ok((views, total))
}

pub async fn list_conversations(
    deps: &ServerDeps,
    actor: UserId,
    limit: u32,
) -> AppResult<Vec<ConversationView>> {
    let summaries = deps.messages.recent_conversations(actor, limit).await?;
    let mut views = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        // Skip conversations whose counterparty deleted their account.
        let Some(other) = deps.users.find_by_id(summary.other_user).await? else {
            continue;
        };
        views.push(ConversationView {
            user: PublicUser::from(&other),
            last_message: build_view(deps, &summary.last_message).await?,
            unread_count: summary.unread_count,
        });
    }
    Ok(views)
}

/// Mark everything `other` sent the caller as read; returns how many flipped.
pub async fn mark_conversation_read(
    deps: &ServerDeps,
    actor: UserId,
    other: UserId,
) -> AppResult<u64> {
    deps.messages.mark_read(other, actor).await
}

pub async fn unread_count(deps: &ServerDeps, actor: UserId) -> AppResult<u64> {
    deps.messages.unread_count(actor).await
}

/// Only the sender may delete a message.
pub async fn delete_message(deps: &ServerDeps, actor: UserId, id: MessageId) -> AppResult<()> {
    let message = deps
        .messages
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message".to_string()))?;
    if message.sender != actor {
        return Err(AppError::Forbidden(
            "You can only delete your own messages".to_string(),
        ));
    }
    deps.messages.delete(id).await
}

pub async fn search_messages(
    deps: &ServerDeps,
    actor: UserId,
    query: &str,
    with_user: Option<UserId>,
    page: u32,
    limit: u32,
) -> AppResult<(Vec<MessageView>, u64)> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::invalid("q", "Search query is required"));
    }
    let (messages, total) = deps
        .messages
        .search(actor, query, with_user, page, limit)
        .await?;
    let mut views = Vec::with_capacity(messages.len());
    for message in &messages {
        views.push(build_view(deps, message).await?);
    }
    Ok((views, total))
}
