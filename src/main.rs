use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::analytics::MoodAggregator;
use services::daily_prompt::AdviceClient;
use services::images::ImageClient;
use services::llm::LlmClient;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub llm: LlmClient,
    pub images: ImageClient,
    pub advice: AdviceClient,
    pub rate_limiter: RateLimitState,
    pub aggregator: MoodAggregator,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>) -> anyhow::Result<Self> {
        // One connection pool for every outbound API.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            llm: LlmClient::new(http.clone(), &config),
            images: ImageClient::new(http.clone(), &config),
            advice: AdviceClient::new(http, &config),
            rate_limiter: RateLimitState::new(
                config.entry_rate_limit,
                config.entry_rate_window_secs,
            ),
            aggregator: MoodAggregator::new(config.analytics_offset()),
            db,
            config,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .route("/api/prompts/daily", get(handlers::prompts::daily_prompt));

    // Endpoints that call the language model: per-user limit, applied after auth.
    let ai_routes = Router::new()
        .route("/api/entries", post(handlers::entries::create_entry))
        .route("/api/entries/:id", put(handlers::entries::update_entry))
        .route("/api/entries/analyze", post(handlers::entries::analyze_entry))
        .route("/api/insights/ask", post(handlers::insights::ask))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_ai,
        ));

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::users::me))
        // Entries
        .route("/api/entries", get(handlers::entries::list_entries))
        .route(
            "/api/entries/:id",
            get(handlers::entries::get_entry).delete(handlers::entries::delete_entry),
        )
        // Collections
        .route(
            "/api/collections",
            get(handlers::collections::list_collections)
                .post(handlers::collections::create_collection),
        )
        .route(
            "/api/collections/:id",
            get(handlers::collections::get_collection)
                .delete(handlers::collections::delete_collection),
        )
        // Drafts
        .route(
            "/api/drafts",
            get(handlers::drafts::get_draft).put(handlers::drafts::save_draft),
        )
        // Analytics
        .route("/api/analytics", get(handlers::analytics::get_analytics))
        .merge(ai_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let mut allowed_origins: Vec<axum::http::HeaderValue> = Vec::new();
    match state.config.frontend_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => allowed_origins.push(origin),
        Err(_) => tracing::warn!(url = %state.config.frontend_url, "FRONTEND_URL is not a valid origin"),
    }
    // In dev, also allow LAN access (e.g. testing from another device)
    if let Ok(extra) = std::env::var("CORS_EXTRA_ORIGINS") {
        for o in extra.split(',') {
            if let Ok(hv) = o.trim().parse::<axum::http::HeaderValue>() {
                allowed_origins.push(hv);
            }
        }
    }
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_rate_limit_cleanup(limiter: RateLimitState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodjournal_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    // Database
    let db = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    let state = AppState::new(db, config.clone()).expect("Failed to build application state");

    if !state.llm.is_configured() {
        tracing::warn!("CLAUDE_API_KEY not set, entries will be saved without mood analysis");
    }

    spawn_rate_limit_cleanup(state.rate_limiter.clone());

    let app = build_router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .await
        .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use http_body_util::BodyExt;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::auth::jwt::issue_test_token;
    use crate::config::test_config;

    // The pool never connects: these requests are answered before any query.
    fn test_app() -> Router {
        let config = test_config();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        build_router(AppState::new(db, Arc::new(config)).unwrap())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "moodjournal-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/entries").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], 401);
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let forged = issue_test_token("user_1", 600, None, "not-the-secret");
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/analytics?period=7d")
                    .header(AUTHORIZATION, format!("Bearer {}", forged))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rate_limited_route_requires_token_first() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/insights/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"question":"How was my week?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_daily_prompt_falls_back_when_upstream_is_down() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/prompts/daily")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["prompt"], crate::services::daily_prompt::FALLBACK_PROMPT);
    }
}
