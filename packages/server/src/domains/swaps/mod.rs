pub mod actions;
pub mod aggregates;
pub mod data;
pub mod machines;
pub mod models;

pub use models::{Swap, SwapRole, SwapStatus, SwapView};
