//! Connection presence registry.
//!
//! Tracks which authenticated user sits behind each live connection. One
//! entry per connection; a user with two tabs open holds two entries, and
//! they only count as offline once the last one goes.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::common::{ConnectionId, UserId};
use crate::domains::users::models::PublicUser;

/// Snapshot of the authenticated user behind a connection, captured at
/// authentication time so presence events don't need a store round-trip.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub user: PublicUser,
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    sessions: Arc<RwLock<HashMap<ConnectionId, Session>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection` to a user. Re-authenticating on the same connection
    /// replaces the previous binding.
    pub async fn register(&self, connection: ConnectionId, session: Session) {
        self.sessions.write().await.insert(connection, session);
    }

    /// Drop the binding, returning it so the caller can emit the offline
    /// event. A second unregister for the same connection is a no-op.
    pub async fn unregister(&self, connection: ConnectionId) -> Option<Session> {
        self.sessions.write().await.remove(&connection)
    }

    pub async fn lookup(&self, connection: ConnectionId) -> Option<Session> {
        self.sessions.read().await.get(&connection).cloned()
    }

    /// Whether `user` has at least one live connection.
    pub async fn is_online(&self, user: UserId) -> bool {
        self.sessions
            .read()
            .await
            .values()
            .any(|s| s.user_id == user)
    }

    /// User ids of everyone currently connected, deduplicated.
    pub async fn online_users(&self) -> Vec<UserId> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<UserId> = sessions.values().map(|s| s.user_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::users::models::User;
    use chrono::Utc;

    fn session(user_id: UserId) -> Session {
        let user = User {
            id: user_id,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            avatar: None,
            location: "London".to_string(),
            bio: String::new(),
            skills_offered: vec![],
            skills_wanted: vec![],
            availability: "Flexible".to_string(),
            rating: 0.0,
            total_ratings: 0,
            total_swaps: 0,
            is_online: true,
            last_seen: Utc::now(),
            reset_password_token: None,
            reset_password_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        Session {
            user_id,
            user: PublicUser::from(&user),
        }
    }

    #[tokio::test]
    async fn test_register_lookup_unregister() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let user = UserId::new();

        assert!(registry.lookup(conn).await.is_none());
        registry.register(conn, session(user)).await;
        assert_eq!(registry.lookup(conn).await.unwrap().user_id, user);
        assert!(registry.is_online(user).await);

        let removed = registry.unregister(conn).await;
        assert_eq!(removed.unwrap().user_id, user);
        assert!(!registry.is_online(user).await);
    }

    #[tokio::test]
    async fn test_second_unregister_is_noop() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        registry.register(conn, session(UserId::new())).await;

        assert!(registry.unregister(conn).await.is_some());
        assert!(registry.unregister(conn).await.is_none());
    }

    #[tokio::test]
    async fn test_user_stays_online_until_last_connection_goes() {
        let registry = PresenceRegistry::new();
        let user = UserId::new();
        let (c1, c2) = (ConnectionId::new(), ConnectionId::new());
        registry.register(c1, session(user)).await;
        registry.register(c2, session(user)).await;

        assert_eq!(registry.online_users().await, vec![user]);
        registry.unregister(c1).await;
        assert!(registry.is_online(user).await);
        registry.unregister(c2).await;
        assert!(!registry.is_online(user).await);
    }
}
