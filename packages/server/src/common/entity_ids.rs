//! Typed ID aliases for the marketplace entities.

use super::id::Id;

/// Marker type for users.
pub struct UserEntity;

/// Marker type for swaps.
pub struct SwapEntity;

/// Marker type for chat messages.
pub struct MessageEntity;

/// Marker type for live realtime connections (ephemeral, never persisted).
pub struct ConnectionEntity;

pub type UserId = Id<UserEntity>;
pub type SwapId = Id<SwapEntity>;
pub type MessageId = Id<MessageEntity>;
pub type ConnectionId = Id<ConnectionEntity>;
