//! Realtime event catalog and topic naming.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::common::{ConnectionId, SwapId, UserId};

/// Broadcast topic every connection subscribes to for presence events.
pub const PRESENCE_TOPIC: &str = "presence";

/// Caller-only topic; error and acknowledgement events land here.
pub fn connection_topic(connection: ConnectionId) -> String {
    format!("conn:{connection}")
}

/// Personal topic for notifications addressed to one user, across all of
/// their connections.
pub fn personal_topic(user: UserId) -> String {
    format!("user:{user}")
}

/// Conversation topic shared by a user pair. Ids are sorted so both sides
/// derive the same name.
pub fn conversation_topic(a: UserId, b: UserId) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("chat:{low}:{high}")
}

/// Client-to-server events, tagged by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Authenticate(AuthenticatePayload),
    JoinChat(JoinChatPayload),
    SendMessage(SendMessagePayload),
    Typing(TypingPayload),
    SwapRequest(SwapRequestPayload),
    SwapResponse(SwapResponsePayload),
    StatusUpdate(StatusUpdatePayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatePayload {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChatPayload {
    pub other_user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub recipient_id: UserId,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<crate::domains::messages::models::MessageType>,
    #[serde(default)]
    pub swap_id: Option<SwapId>,
    #[serde(default)]
    pub reply_to: Option<crate::common::MessageId>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub recipient_id: UserId,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequestPayload {
    pub provider_id: UserId,
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
    pub is_remote: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponsePayload {
    pub swap_id: SwapId,
    /// "accept" or "reject".
    pub action: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub is_online: bool,
}
