use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::UserId;

/// User - a marketplace participant.
///
/// Holds the credential fields (`password_hash`, reset token); it is never
/// serialized to the wire directly. [`PublicUser`] is the sanitized view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Stored lowercased; uniqueness is case-insensitive.
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub location: String,
    pub bio: String,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    /// One of the [`Availability`] labels.
    pub availability: String,
    /// Running arithmetic mean of all ratings received (0 when unrated).
    pub rating: f64,
    pub total_ratings: i32,
    pub total_swaps: i32,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    /// Single active password-reset token, if any.
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Average rating rounded to one decimal; 0.0 until the first rating.
    pub fn average_rating(&self) -> f64 {
        if self.total_ratings > 0 {
            (self.rating * 10.0).round() / 10.0
        } else {
            0.0
        }
    }

    /// Case-insensitive substring check against the offered-skill list.
    pub fn offers_skill(&self, skill: &str) -> bool {
        let needle = skill.to_lowercase();
        self.skills_offered
            .iter()
            .any(|s| s.to_lowercase().contains(&needle))
    }
}

/// Availability enum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Availability {
    Weekdays,
    Weekends,
    Evenings,
    Flexible,
    WeekdaysAndEvenings,
}

impl Availability {
    pub const LABELS: [&'static str; 5] = [
        "Weekdays",
        "Weekends",
        "Evenings",
        "Flexible",
        "Weekdays & Evenings",
    ];
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::Weekdays => write!(f, "Weekdays"),
            Availability::Weekends => write!(f, "Weekends"),
            Availability::Evenings => write!(f, "Evenings"),
            Availability::Flexible => write!(f, "Flexible"),
            Availability::WeekdaysAndEvenings => write!(f, "Weekdays & Evenings"),
        }
    }
}

impl std::str::FromStr for Availability {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Weekdays" => Ok(Availability::Weekdays),
            "Weekends" => Ok(Availability::Weekends),
            "Evenings" => Ok(Availability::Evenings),
            "Flexible" => Ok(Availability::Flexible),
            "Weekdays & Evenings" => Ok(Availability::WeekdaysAndEvenings),
            _ => Err(anyhow::anyhow!("Invalid availability: {}", s)),
        }
    }
}

/// Wire representation of a user, stripped of credential fields.
///
/// `email` is only populated for the owner's own views (`/auth/me`,
/// login/register responses); public listings leave it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub location: String,
    pub bio: String,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub availability: String,
    pub rating: f64,
    pub total_ratings: i32,
    pub average_rating: f64,
    pub total_swaps: i32,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl PublicUser {
    /// Owner's view, including the email address.
    pub fn owned(user: &User) -> Self {
        let mut view = Self::from(user);
        view.email = Some(user.email.clone());
        view
    }
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: None,
            avatar: user.avatar.clone(),
            location: user.location.clone(),
            bio: user.bio.clone(),
            skills_offered: user.skills_offered.clone(),
            skills_wanted: user.skills_wanted.clone(),
            availability: user.availability.clone(),
            rating: user.rating,
            total_ratings: user.total_ratings,
            average_rating: user.average_rating(),
            total_swaps: user.total_swaps,
            is_online: user.is_online,
            last_seen: user.last_seen,
        }
    }
}

/// Search filter for user listings; all fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Substring over name, location and both skill lists.
    pub search: Option<String>,
    pub location: Option<String>,
    /// Matches either skill list, case-insensitive substring.
    pub skill: Option<String>,
    pub availability: Option<String>,
    pub min_rating: Option<f64>,
    /// The caller, excluded from their own browse results.
    pub exclude: Option<UserId>,
}

/// Which skill list a skill-statistics query counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillSide {
    Offered,
    Wanted,
    Either,
}
