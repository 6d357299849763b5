//! Swap lifecycle endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{AppError, AppResult, SwapId};
use crate::domains::swaps::actions::{self, CreateSwapRequest};
use crate::domains::swaps::machines::SwapAction;
use crate::domains::swaps::models::{SwapStatus, SwapView};
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::{ApiResponse, Pagination};
use crate::server::routes::PageQuery;

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateRequest {
    pub rating: i32,
    pub review: Option<String>,
}

pub async fn create_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateSwapRequest>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::create_swap(&state.deps, auth.user_id, request).await?;
    Ok(ApiResponse::ok_with_message(view, "Swap request sent successfully"))
}

pub async fn list_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Value>> {
    let status = match &query.status {
        Some(raw) => Some(
            raw.parse::<SwapStatus>()
                .map_err(|_| AppError::invalid("status", "Invalid swap status"))?,
        ),
        None => None,
    };
    let (page, limit) = query.page.clamped(50);
    let (swaps, total) = actions::list_swaps(&state.deps, auth.user_id, status, page, limit).await?;
    Ok(ApiResponse::ok(json!({
        "swaps": swaps,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn get_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::get_swap(&state.deps, auth.user_id, id).await?;
    Ok(ApiResponse::ok(view))
}

pub async fn accept_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::apply_action(&state.deps, auth.user_id, id, SwapAction::Accept).await?;
    Ok(ApiResponse::ok_with_message(view, "Swap accepted"))
}

pub async fn reject_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::apply_action(&state.deps, auth.user_id, id, SwapAction::Reject).await?;
    Ok(ApiResponse::ok_with_message(view, "Swap rejected"))
}

pub async fn complete_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::apply_action(&state.deps, auth.user_id, id, SwapAction::Complete).await?;
    Ok(ApiResponse::ok_with_message(view, "Swap completed"))
}

pub async fn cancel_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
    request: Option<Json<CancelRequest>>,
) -> AppResult<ApiResponse<SwapView>> {
    let reason = request.and_then(|Json(r)| r.reason);
    let view =
        actions::apply_action(&state.deps, auth.user_id, id, SwapAction::Cancel { reason }).await?;
    Ok(ApiResponse::ok_with_message(view, "Swap cancelled"))
}

pub async fn rate_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SwapId>,
    Json(request): Json<RateRequest>,
) -> AppResult<ApiResponse<SwapView>> {
    let view = actions::apply_action(
        &state.deps,
        auth.user_id,
        id,
        SwapAction::Rate {
            rating: request.rating,
            review: request.review,
        },
    )
    .await?;
    Ok(ApiResponse::ok_with_message(view, "Rating submitted"))
}
