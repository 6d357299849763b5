pub mod deps;
pub mod hub;
pub mod memory;
pub mod presence;
pub mod stores;

pub use deps::ServerDeps;
pub use hub::{Envelope, EventHub};
pub use presence::{PresenceRegistry, Session};
