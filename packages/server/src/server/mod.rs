// HTTP server setup (Axum + WebSocket)
pub mod app;
pub mod middleware;
pub mod response;
pub mod routes;

pub use app::*;
