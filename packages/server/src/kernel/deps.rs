//! Dependency container shared by handlers, the event router and tests.

use std::sync::Arc;

use crate::domains::auth::jwt::JwtService;
use crate::kernel::hub::EventHub;
use crate::kernel::memory::{InMemoryMessageStore, InMemorySwapStore, InMemoryUserStore};
use crate::kernel::presence::PresenceRegistry;
use crate::kernel::stores::{BaseMessageStore, BaseSwapStore, BaseUserStore};

#[derive(Clone)]
pub struct ServerDeps {
    pub users: Arc<dyn BaseUserStore>,
    pub swaps: Arc<dyn BaseSwapStore>,
    pub messages: Arc<dyn BaseMessageStore>,
    pub jwt: Arc<JwtService>,
    pub hub: EventHub,
    pub presence: PresenceRegistry,
}

impl ServerDeps {
    pub fn new(
        users: Arc<dyn BaseUserStore>,
        swaps: Arc<dyn BaseSwapStore>,
        messages: Arc<dyn BaseMessageStore>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            users,
            swaps,
            messages,
            jwt,
            hub: EventHub::new(),
            presence: PresenceRegistry::new(),
        }
    }

    /// All-in-memory wiring for tests.
    pub fn in_memory(jwt: Arc<JwtService>) -> Self {
        Self::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySwapStore::new()),
            Arc::new(InMemoryMessageStore::new()),
            jwt,
        )
    }
}
