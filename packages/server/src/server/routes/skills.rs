//! Skill catalog endpoints.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::common::AppResult;
use crate::domains::skills::actions;
use crate::domains::skills::catalog::{POPULAR_SKILLS, SKILL_CATEGORIES};
use crate::server::app::AppState;
use crate::server::middleware::AuthUser;
use crate::server::response::{ApiResponse, Pagination};
use crate::server::routes::PageQuery;

fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillSearchQuery {
    pub q: String,
    pub category: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUsersQuery {
    pub location: Option<String>,
    pub availability: Option<String>,
    #[serde(default, deserialize_with = "crate::server::routes::de_opt_f64")]
    pub rating: Option<f64>,
    #[serde(flatten)]
    pub page: PageQuery,
}

pub async fn categories_handler() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "skillCategories": SKILL_CATEGORIES }))
}

pub async fn popular_handler() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "popularSkills": POPULAR_SKILLS }))
}

pub async fn search_handler(
    Query(query): Query<SkillSearchQuery>,
) -> AppResult<ApiResponse<Value>> {
    let limit = query.limit.clamp(1, 100);
    let skills = actions::search_skills(&query.q, query.category.as_deref(), limit)?;
    let total = skills.len();
    Ok(ApiResponse::ok(json!({
        "skills": skills,
        "total": total,
        "query": query.q,
        "category": query.category.as_deref().unwrap_or("all"),
    })))
}

pub async fn users_by_skill_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(skill): Path<String>,
    Query(query): Query<SkillUsersQuery>,
) -> AppResult<ApiResponse<Value>> {
    let (page, limit) = query.page.clamped(50);
    let (users, total) = actions::users_by_skill(
        &state.deps,
        auth.user_id,
        &skill,
        query.location,
        query.availability,
        query.rating,
        page,
        limit,
    )
    .await?;
    Ok(ApiResponse::ok(json!({
        "skill": skill,
        "users": users,
        "pagination": Pagination::new(page, limit, total),
    })))
}

pub async fn stats_handler(
    State(state): State<AppState>,
    Path(skill): Path<String>,
) -> AppResult<ApiResponse<Value>> {
    let stats = actions::skill_stats(&state.deps, &skill).await?;
    Ok(ApiResponse::ok(json!({ "skill": skill, "stats": stats })))
}
