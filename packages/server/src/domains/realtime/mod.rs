pub mod events;
pub mod router;

pub use router::EventRouter;
