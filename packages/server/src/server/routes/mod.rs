pub mod auth;
pub mod health;
pub mod messages;
pub mod skills;
pub mod stream;
pub mod swaps;
pub mod users;

use serde::{Deserialize, Deserializer};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

// Query-string values arrive as text when this struct is flattened into a
// larger one, so accept both forms.
fn de_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

pub(crate) fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Shared `?page=&limit=` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page", deserialize_with = "de_u32")]
    pub page: u32,
    #[serde(default = "default_limit", deserialize_with = "de_u32")]
    pub limit: u32,
}

impl PageQuery {
    /// Clamp the page size to something the database should be asked for.
    pub fn clamped(&self, max: u32) -> (u32, u32) {
        (self.page.max(1), self.limit.clamp(1, max))
    }
}
