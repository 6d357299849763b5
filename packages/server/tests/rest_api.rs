//! End-to-end tests over the HTTP surface, backed by in-memory stores.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use skillswap_core::domains::auth::JwtService;
use skillswap_core::kernel::ServerDeps;
use skillswap_core::server::build_app;
use skillswap_core::Config;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        port: 0,
        jwt_secret: "test_secret".to_string(),
        jwt_issuer: "test_issuer".to_string(),
        jwt_expires_hours: 1,
        allowed_origins: vec![],
        rate_limit_per_second: 1000,
        rate_limit_burst: 1000,
    }
}

fn test_app() -> Router {
    let config = test_config();
    let jwt = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        config.jwt_expires_hours,
    ));
    build_app(ServerDeps::in_memory(jwt), &config)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "127.0.0.1");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, name: &str, offers: &[&str]) -> (String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "hunter22",
            "location": "Berlin",
            "skillsOffered": offers,
            "skillsWanted": ["Spanish"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    (
        body["data"]["token"].as_str().unwrap().to_string(),
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_register_login_me_flow() {
    let app = test_app();
    let (token, user_id) = register(&app, "Ada", &["Piano"]).await;

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], user_id.as_str());
    assert_eq!(body["data"]["email"], "ada@example.com");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["isOnline"], true);
}

#[tokio::test]
async fn test_register_validation_error_shape() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "nope", "password": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_browse_and_skill_filter() {
    let app = test_app();
    let (token, _) = register(&app, "Ada", &["Piano"]).await;
    register(&app, "Grace", &["Web Development"]).await;

    let (status, body) = send(&app, "GET", "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1); // caller excluded
    assert_eq!(users[0]["name"], "Grace");
    assert!(users[0].get("email").is_none());

    let (_, body) = send(&app, "GET", "/api/users?skill=web", Some(&token), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    let (_, body) = send(&app, "GET", "/api/users?skill=juggling", Some(&token), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_swap_lifecycle_over_http() {
    let app = test_app();
    let (requester_token, _) = register(&app, "Ada", &["Guitar"]).await;
    let (provider_token, provider_id) = register(&app, "Grace", &["Piano"]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/swaps",
        Some(&requester_token),
        Some(json!({
            "provider": provider_id,
            "requestedSkill": "Piano",
            "offeredSkill": "Guitar",
            "message": "Trade lessons?",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    let swap_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");

    // The requester may not accept their own request.
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/swaps/{swap_id}/accept"),
        Some(&requester_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/swaps/{swap_id}/accept"),
        Some(&provider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "accepted");

    // Second accept reports the state the first one left behind.
    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/swaps/{swap_id}/accept"),
        Some(&provider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("accepted"));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/swaps/{swap_id}/complete"),
        Some(&requester_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/swaps/{swap_id}/rate"),
        Some(&requester_token),
        Some(json!({ "rating": 5, "review": "great teacher" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Rating twice is a conflict.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/swaps/{swap_id}/rate"),
        Some(&requester_token),
        Some(json!({ "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The provider's aggregate picked up the rating.
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/users/{provider_id}"),
        Some(&requester_token),
        None,
    )
    .await;
    assert_eq!(body["data"]["averageRating"], 5.0);
    assert_eq!(body["data"]["totalSwaps"], 1);
}

#[tokio::test]
async fn test_duplicate_pending_swap_is_conflict() {
    let app = test_app();
    let (token, _) = register(&app, "Ada", &["Guitar"]).await;
    let (_, provider_id) = register(&app, "Grace", &["Piano"]).await;

    let body = json!({
        "provider": provider_id,
        "requestedSkill": "Piano",
        "offeredSkill": "Guitar",
        "message": "Trade lessons?",
    });
    let (status, _) = send(&app, "POST", "/api/swaps", Some(&token), Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/api/swaps", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_third_party_cannot_see_swap() {
    let app = test_app();
    let (requester_token, _) = register(&app, "Ada", &["Guitar"]).await;
    let (_, provider_id) = register(&app, "Grace", &["Piano"]).await;
    let (outsider_token, _) = register(&app, "Eve", &[]).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/swaps",
        Some(&requester_token),
        Some(json!({
            "provider": provider_id,
            "requestedSkill": "Piano",
            "offeredSkill": "Guitar",
            "message": "Trade lessons?",
        })),
    )
    .await;
    let swap_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/swaps/{swap_id}"),
        Some(&outsider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_messaging_flow() {
    let app = test_app();
    let (ada_token, _) = register(&app, "Ada", &[]).await;
    let (grace_token, grace_id) = register(&app, "Grace", &[]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/messages",
        Some(&ada_token),
        Some(json!({ "recipient": grace_id, "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let message_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, "GET", "/api/messages/unread/count", Some(&grace_token), None).await;
    assert_eq!(body["data"]["unreadCount"], 1);

    let (_, body) = send(
        &app,
        "GET",
        "/api/messages/conversations",
        Some(&grace_token),
        None,
    )
    .await;
    assert_eq!(body["data"][0]["unreadCount"], 1);
    assert_eq!(body["data"][0]["lastMessage"]["content"], "hello");

    // Fetching the conversation marks it read.
    let (_, body) = send(
        &app,
        "GET",
        &format!(
            "/api/messages/conversation/{}",
            body["data"][0]["user"]["id"].as_str().unwrap()
        ),
        Some(&grace_token),
        None,
    )
    .await;
    assert_eq!(body["data"]["messages"][0]["content"], "hello");
    let (_, body) = send(&app, "GET", "/api/messages/unread/count", Some(&grace_token), None).await;
    assert_eq!(body["data"]["unreadCount"], 0);

    // Only the sender may delete.
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/messages/{message_id}"),
        Some(&grace_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/messages/{message_id}"),
        Some(&ada_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_skill_catalog_is_public() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/api/skills/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["skillCategories"].as_array().unwrap().len(), 8);

    let (status, body) = send(&app, "GET", "/api/skills/search?q=design", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["total"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn test_skill_stats_over_http() {
    let app = test_app();
    register(&app, "Ada", &["Piano"]).await;

    let (status, body) = send(&app, "GET", "/api/skills/stats/Piano", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stats"]["usersOffering"], 1);
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let app = test_app();
    let (ada_token, ada_id) = register(&app, "Ada", &["Guitar"]).await;
    let (grace_token, grace_id) = register(&app, "Grace", &["Piano"]).await;

    send(
        &app,
        "POST",
        "/api/swaps",
        Some(&ada_token),
        Some(json!({
            "provider": grace_id,
            "requestedSkill": "Piano",
            "offeredSkill": "Guitar",
            "message": "Trade lessons?",
        })),
    )
    .await;

    let (status, _) = send(
        &app,
        "DELETE",
        "/api/users/account",
        Some(&ada_token),
        Some(json!({ "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/users/{ada_id}"),
        Some(&grace_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/swaps", Some(&grace_token), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_public_browse_needs_no_token() {
    let app = test_app();
    let (ada_token, _) = register(&app, "Ada", &["Piano"]).await;
    register(&app, "Grace", &["Guitar"]).await;

    // Anonymous callers see everyone.
    let (status, body) = send(&app, "GET", "/api/users/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 2);

    // With a token the caller drops out of their own listing.
    let (_, body) = send(&app, "GET", "/api/users/public", Some(&ada_token), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["users"][0]["name"], "Grace");
}

#[tokio::test]
async fn test_avatar_update() {
    let app = test_app();
    let (token, _) = register(&app, "Ada", &["Piano"]).await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/avatar",
        Some(&token),
        Some(json!({ "avatar": "https://cdn.example.com/ada.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["avatar"], "https://cdn.example.com/ada.png");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/avatar",
        Some(&token),
        Some(json!({ "avatar": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_overview() {
    let app = test_app();
    let (ada_token, _) = register(&app, "Ada", &["Guitar"]).await;
    let (grace_token, grace_id) = register(&app, "Grace", &["Piano"]).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/swaps",
        Some(&ada_token),
        Some(json!({
            "provider": grace_id,
            "requestedSkill": "Piano",
            "offeredSkill": "Guitar",
            "message": "Trade lessons?",
        })),
    )
    .await;
    let swap_id = body["data"]["id"].as_str().unwrap().to_string();
    send(
        &app,
        "PUT",
        &format!("/api/swaps/{swap_id}/accept"),
        Some(&grace_token),
        None,
    )
    .await;
    send(
        &app,
        "POST",
        "/api/messages",
        Some(&grace_token),
        Some(json!({ "recipient": body["data"]["requester"]["id"], "content": "See you Tuesday" })),
    )
    .await;

    let (status, body) = send(
        &app,
        "GET",
        "/api/users/stats/overview",
        Some(&ada_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalSwaps"], 1);
    assert_eq!(body["data"]["completedSwaps"], 0);
    assert_eq!(body["data"]["pendingSwaps"], 1);
    assert_eq!(body["data"]["totalMessages"], 1);
    assert_eq!(body["data"]["unreadMessages"], 1);
}
