//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::domains::messages::data::PgMessageStore;
use crate::domains::realtime::EventRouter;
use crate::domains::swaps::data::PgSwapStore;
use crate::domains::users::data::PgUserStore;
use crate::kernel::ServerDeps;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{auth, health, messages, skills, stream, swaps, users};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
    pub router: EventRouter,
}

impl AppState {
    pub fn new(deps: ServerDeps) -> Self {
        Self {
            router: EventRouter::new(deps.clone()),
            deps,
        }
    }
}

/// Wire the Postgres-backed dependency container.
pub fn build_deps(pool: PgPool, config: &Config) -> ServerDeps {
    let jwt = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        config.jwt_expires_hours,
    ));
    ServerDeps::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgSwapStore::new(pool.clone())),
        Arc::new(PgMessageStore::new(pool)),
        jwt,
    )
}

/// Build the Axum application router over an already-wired dependency
/// container. Tests call this with in-memory stores.
pub fn build_app(deps: ServerDeps, config: &Config) -> Router {
    let state = AppState::new(deps);
    let jwt_service = state.deps.jwt.clone();

    // CORS: explicit allow-list, or any origin when none is configured
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    };

    // Rate limiting per IP, X-Forwarded-For aware
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/me", get(auth::me_handler))
        .route("/refresh", post(auth::refresh_handler))
        .route("/forgot-password", post(auth::forgot_password_handler))
        .route("/reset-password", post(auth::reset_password_handler))
        // Kept for clients that still update the profile through /auth
        .route("/profile", put(users::update_profile_handler));

    let user_routes = Router::new()
        .route("/", get(users::browse_handler))
        .route("/public", get(users::public_browse_handler))
        .route("/profile", put(users::update_profile_handler))
        .route("/avatar", put(users::update_avatar_handler))
        .route("/stats/overview", get(users::stats_overview_handler))
        .route("/account", delete(users::delete_account_handler))
        .route("/:id", get(users::get_user_handler));

    let swap_routes = Router::new()
        .route("/", post(swaps::create_handler).get(swaps::list_handler))
        .route("/:id", get(swaps::get_handler))
        .route("/:id/accept", put(swaps::accept_handler))
        .route("/:id/reject", put(swaps::reject_handler))
        .route("/:id/complete", put(swaps::complete_handler))
        .route("/:id/cancel", put(swaps::cancel_handler))
        .route("/:id/rate", post(swaps::rate_handler));

    let message_routes = Router::new()
        .route("/", post(messages::send_handler))
        .route("/conversations", get(messages::conversations_handler))
        .route("/conversation/:user_id", get(messages::conversation_handler))
        .route("/read/:user_id", put(messages::mark_read_handler))
        .route("/unread/count", get(messages::unread_count_handler))
        .route("/search", get(messages::search_handler))
        .route("/:id", delete(messages::delete_handler));

    let skill_routes = Router::new()
        .route("/categories", get(skills::categories_handler))
        .route("/popular", get(skills::popular_handler))
        .route("/search", get(skills::search_handler))
        .route("/users/:skill", get(skills::users_by_skill_handler))
        .route("/stats/:skill", get(skills::stats_handler));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/swaps", swap_routes)
        .nest("/messages", message_routes)
        .nest("/skills", skill_routes)
        .layer(rate_limit_layer);

    Router::new()
        .nest("/api", api)
        // Health check and WebSocket upgrade are not rate limited
        .route("/health", get(health::health_handler))
        .route("/ws", get(stream::stream_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
