pub mod auth;
pub mod messages;
pub mod realtime;
pub mod skills;
pub mod swaps;
pub mod users;
