//! Messaging endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::{AppResult, MessageId, UserId};
use crate::domains::messages::actions::{self, ConversationView, SendMessageRequest};
use crate::domains::messages::models::MessageView;
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::{ApiResponse, Pagination};
use crate::server::routes::PageQuery;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    pub with_user: Option<UserId>,
    #[serde(flatten)]
    pub page: PageQuery,
}

pub async fn send_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<ApiResponse<MessageView>> {
    let view = actions::send_message(&state.deps, auth.user_id, request).await?;
    Ok(ApiResponse::ok(view))
}

pub async fn conversations_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<ConversationView>>> {
    let (_, limit) = query.clamped(50);
    let conversations = actions::list_conversations(&state.deps, auth.user_id, limit).await?;
    Ok(ApiResponse::ok(conversations))
}

pub async fn conversation_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other): Path<UserId>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Value>> {
    let (page, limit) = query.clamped(100);
    let (messages, total) =
        actions::get_conversation(&state.deps, auth.user_id, other, page, limit).await?;
    Ok(ApiResponse::ok(json!({
        "messages": messages,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn mark_read_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other): Path<UserId>,
) -> AppResult<ApiResponse<Value>> {
    let updated = actions::mark_conversation_read(&state.deps, auth.user_id, other).await?;
    Ok(ApiResponse::ok(json!({ "updated": updated })))
}

pub async fn unread_count_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<Value>> {
    let count = actions::unread_count(&state.deps, auth.user_id).await?;
    Ok(ApiResponse::ok(json!({ "unreadCount": count })))
}

pub async fn delete_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<MessageId>,
) -> AppResult<ApiResponse<()>> {
    actions::delete_message(&state.deps, auth.user_id, id).await?;
    Ok(ApiResponse::message("Message deleted"))
}

pub async fn search_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<ApiResponse<Value>> {
    let (page, limit) = query.page.clamped(50);
    let (messages, total) = actions::search_messages(
        &state.deps,
        auth.user_id,
        &query.q,
        query.with_user,
        page,
        limit,
    )
    .await?;
    Ok(ApiResponse::ok(json!({
        "messages": messages,
        "pagination": Pagination::new(page, limit, total),
    })))
}
