//! User use-cases: browse, profile, account deletion.

use serde::{Deserialize, Serialize};

use crate::common::{AppError, AppResult, FieldError, UserId};
use crate::domains::auth::password::verify_password;
use crate::domains::swaps::models::SwapStatus;
use crate::domains::users::models::{Availability, PublicUser, UserFilter};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub skills_offered: Option<Vec<String>>,
    pub skills_wanted: Option<Vec<String>>,
    pub availability: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    pub total_swaps: u64,
    pub completed_swaps: u64,
    pub pending_swaps: u64,
    pub total_messages: u64,
    pub unread_messages: u64,
}

/// Filtered public listing; `exclude` drops the caller when one is known.
/// Online users sort first.
pub async fn browse_users(
    deps: &ServerDeps,
    exclude: Option<UserId>,
    mut filter: UserFilter,
    page: u32,
    limit: u32,
) -> AppResult<(Vec<PublicUser>, u64)> {
    filter.exclude = exclude;
    let (users, total) = deps.users.search(&filter, page, limit).await?;
    Ok((users.iter().map(PublicUser::from).collect(), total))
}

pub async fn get_user(deps: &ServerDeps, id: UserId) -> AppResult<PublicUser> {
    let user = deps
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(PublicUser::from(&user))
}

/// Partial profile update; absent fields keep their current values.
pub async fn update_profile(
    deps: &ServerDeps,
    actor: UserId,
    request: UpdateProfileRequest,
) -> AppResult<PublicUser> {
    let mut errors = Vec::new();
    if let Some(name) = &request.name {
        let name = name.trim();
        if !(2..=50).contains(&name.chars().count()) {
            errors.push(FieldError {
                field: "name".to_string(),
                message: "Name must be between 2 and 50 characters".to_string(),
            });
        }
    }
    if let Some(bio) = &request.bio {
        if bio.chars().count() > 500 {
            errors.push(FieldError {
                field: "bio".to_string(),
                message: "Bio cannot be more than 500 characters".to_string(),
            });
        }
    }
    if let Some(availability) = &request.availability {
        if availability.parse::<Availability>().is_err() {
            errors.push(FieldError {
                field: "availability".to_string(),
                message: "Invalid availability".to_string(),
            });
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let mut user = deps
        .users
        .find_by_id(actor)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    if let Some(name) = request.name {
        user.name = name.trim().to_string();
    }
    if let Some(location) = request.location {
        user.location = location;
    }
    if let Some(bio) = request.bio {
        user.bio = bio;
    }
    if let Some(avatar) = request.avatar {
        user.avatar = if avatar.is_empty() { None } else { Some(avatar) };
    }
    if let Some(skills) = request.skills_offered {
        user.skills_offered = skills;
    }
    if let Some(skills) = request.skills_wanted {
        user.skills_wanted = skills;
    }
    if let Some(availability) = request.availability {
        user.availability = availability;
    }
    deps.users.update(&user).await?;
    Ok(PublicUser::owned(&user))
}

/// Store the caller's new avatar URL. The upload itself happens elsewhere;
/// this only records where the image lives.
pub async fn update_avatar(
    deps: &ServerDeps,
    actor: UserId,
    avatar: String,
) -> AppResult<PublicUser> {
    if avatar.trim().is_empty() {
        return Err(AppError::Validation(vec![FieldError {
            field: "avatar".to_string(),
            message: "Avatar URL is required".to_string(),
        }]));
    }
    let mut user = deps
        .users
        .find_by_id(actor)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    user.avatar = Some(avatar);
    deps.users.update(&user).await?;
    Ok(PublicUser::owned(&user))
}

/// Swap and message counts for the caller's dashboard.
pub async fn account_overview(deps: &ServerDeps, actor: UserId) -> AppResult<AccountOverview> {
    let (_, total_swaps) = deps.swaps.list_for_user(actor, None, 1, 1).await?;
    let (_, completed) = deps
        .swaps
        .list_for_user(actor, Some(SwapStatus::Completed), 1, 1)
        .await?;
    let (_, pending) = deps
        .swaps
        .list_for_user(actor, Some(SwapStatus::Pending), 1, 1)
        .await?;
    let (_, accepted) = deps
        .swaps
        .list_for_user(actor, Some(SwapStatus::Accepted), 1, 1)
        .await?;

    Ok(AccountOverview {
        total_swaps,
        completed_swaps: completed,
        // "pending" on the dashboard means anything still in motion.
        pending_swaps: pending + accepted,
        total_messages: deps.messages.count_for_user(actor).await?,
        unread_messages: deps.messages.unread_count(actor).await?,
    })
}

/// Delete the account and everything attached to it. Requires the current
/// password as confirmation.
pub async fn delete_account(
    deps: &ServerDeps,
    actor: UserId,
    request: DeleteAccountRequest,
) -> AppResult<()> {
    let user = deps
        .users
        .find_by_id(actor)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(AppError::Auth("Incorrect password".to_string()));
    }

    deps.swaps.delete_for_user(actor).await?;
    deps.messages.delete_for_user(actor).await?;
    deps.users.delete(actor).await?;
    Ok(())
}
