// SkillSwap - skill bartering marketplace backend
//
// REST facade + realtime event router over a shared domain core. The swap
// state machine, presence registry and event hub are transport-agnostic;
// the axum layer in `server/` and the WebSocket router in
// `domains/realtime/` both drive the same transition and persistence calls.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
