//! User browse and profile endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{AppResult, UserId};
use crate::domains::users::actions::{
    self, AccountOverview, DeleteAccountRequest, UpdateProfileRequest,
};
use crate::domains::users::models::{PublicUser, UserFilter};
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::{ApiResponse, Pagination};
use crate::server::routes::PageQuery;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "crate::server::routes::de_opt_f64")]
    pub min_rating: Option<f64>,
    #[serde(flatten)]
    pub page: PageQuery,
}

impl BrowseQuery {
    fn into_parts(self, max_limit: u32) -> (UserFilter, u32, u32) {
        let (page, limit) = self.page.clamped(max_limit);
        let filter = UserFilter {
            search: self.search,
            location: self.location,
            skill: self.skill,
            availability: self.availability,
            min_rating: self.min_rating,
            exclude: None,
        };
        (filter, page, limit)
    }
}

pub async fn browse_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<BrowseQuery>,
) -> AppResult<ApiResponse<Value>> {
    let (filter, page, limit) = query.into_parts(50);
    let (users, total) =
        actions::browse_users(&state.deps, Some(auth.user_id), filter, page, limit).await?;
    Ok(ApiResponse::ok(json!({
        "users": users,
        "pagination": Pagination::new(page, limit, total),
    })))
}

/// Open variant of the browse listing. The caller is excluded from their own
/// results only when a valid bearer token happens to be present.
pub async fn public_browse_handler(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<ApiResponse<Value>> {
    let (filter, page, limit) = query.into_parts(50);
    let exclude = auth.map(|a| a.user_id);
    let (users, total) = actions::browse_users(&state.deps, exclude, filter, page, limit).await?;
    Ok(ApiResponse::ok(json!({
        "users": users,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<UserId>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = actions::get_user(&state.deps, id).await?;
    Ok(ApiResponse::ok(user))
}

pub async fn update_profile_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = actions::update_profile(&state.deps, auth.user_id, request).await?;
    Ok(ApiResponse::ok_with_message(user, "Profile updated successfully"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

pub async fn update_avatar_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateAvatarRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = actions::update_avatar(&state.deps, auth.user_id, request.avatar).await?;
    Ok(ApiResponse::ok_with_message(user, "Avatar updated successfully"))
}

pub async fn stats_overview_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<AccountOverview>> {
    let overview = actions::account_overview(&state.deps, auth.user_id).await?;
    Ok(ApiResponse::ok(overview))
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<DeleteAccountRequest>,
) -> AppResult<ApiResponse<()>> {
    actions::delete_account(&state.deps, auth.user_id, request).await?;
    Ok(ApiResponse::message("Account deleted successfully"))
}
