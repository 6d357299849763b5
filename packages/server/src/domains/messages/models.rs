use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{MessageId, SwapId, UserId};
use crate::domains::users::models::User;

/// Message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "message_type", rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    File,
    SwapRequest,
    SwapResponse,
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}

/// Message - one unit of chat between two users, optionally tagged to a swap.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub content: String,
    pub message_type: MessageType,
    pub swap_id: Option<SwapId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    /// Attachment URLs.
    pub attachments: Vec<String>,
    /// Must reference a message of the same conversation.
    pub reply_to: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The unordered participant pair identifying this conversation.
    pub fn participants(&self) -> (UserId, UserId) {
        (self.sender, self.recipient)
    }

    /// Whether `a` and `b` are exactly this message's two participants.
    pub fn belongs_to_conversation(&self, a: UserId, b: UserId) -> bool {
        (self.sender == a && self.recipient == b) || (self.sender == b && self.recipient == a)
    }
}

/// Embedded sender/recipient summary on message views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageParty {
    pub id: UserId,
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&User> for MessageParty {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Wire representation of a message with populated parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub sender: MessageParty,
    pub recipient: MessageParty,
    pub content: String,
    pub message_type: MessageType,
    pub swap_id: Option<SwapId>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub reply_to: Option<MessageId>,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: &Message, sender: &User, recipient: &User) -> Self {
        Self {
            id: message.id,
            sender: MessageParty::from(sender),
            recipient: MessageParty::from(recipient),
            content: message.content.clone(),
            message_type: message.message_type,
            swap_id: message.swap_id,
            is_read: message.is_read,
            read_at: message.read_at,
            attachments: message.attachments.clone(),
            reply_to: message.reply_to,
            created_at: message.created_at,
        }
    }
}

/// One entry of the recent-conversations listing: the counterparty, the
/// latest message and how many of their messages are still unread.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub other_user: UserId,
    pub last_message: Message,
    pub unread_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_belongs_to_conversation_is_symmetric() {
        let a = UserId::new();
        let b = UserId::new();
        let c = UserId::new();
        let message = Message {
            id: MessageId::new(),
            sender: a,
            recipient: b,
            content: "hi".to_string(),
            message_type: MessageType::Text,
            swap_id: None,
            is_read: false,
            read_at: None,
            attachments: vec![],
            reply_to: None,
            created_at: Utc::now(),
        };

        assert!(message.belongs_to_conversation(a, b));
        assert!(message.belongs_to_conversation(b, a));
        assert!(!message.belongs_to_conversation(a, c));
    }
}
