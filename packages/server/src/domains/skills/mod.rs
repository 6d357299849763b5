pub mod actions;
pub mod catalog;

pub use catalog::{POPULAR_SKILLS, SKILL_CATEGORIES};
