//! # HTTP API
//!
//! JSON API over the catalog, built on axum.
//!
//! | Method | Path | Access |
//! | --- | --- | --- |
//! | GET | `/health` | public |
//! | GET | `/api/home`, `/api/statistics`, `/api/success-dashboard`, `/api/items-by-date` | public |
//! | POST | `/api/users` | public |
//! | GET | `/api/items`, `/api/items/{id}`, `/api/items/{id}/share` | public |
//! | POST | `/api/items/lost`, `/api/items/found` | `X-User-Id` |
//! | PUT, DELETE | `/api/items/{id}` | `X-User-Id` (owner) |
//! | POST | `/api/items/{id}/claim`, `/api/items/{id}/return` | `X-User-Id` |
//! | GET | `/api/dashboard` | `X-User-Id` |
//! | POST | `/api/claims/{id}/approve`, `/api/claims/{id}/reject` | `X-User-Id` (item owner) |
//! | GET | `/api/admin/items/pending` | Bearer API key |
//! | POST | `/api/admin/items/{id}/moderate`, `/api/admin/matching/run` | Bearer API key |

pub mod auth;
pub mod error;
pub mod handlers;
pub mod types;

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lostfound_core::Catalog;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Application state shared across handlers.
pub struct AppState {
    pub catalog: Mutex<Catalog>,
    pub config: ServerConfig,
    pub limiter: DefaultDirectRateLimiter,
}

impl AppState {
    pub fn new(catalog: Catalog, config: ServerConfig) -> Arc<Self> {
        let per_second = NonZeroU32::new(config.rate_limit).unwrap_or(NonZeroU32::MIN);
        Arc::new(Self {
            catalog: Mutex::new(catalog),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            config,
        })
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::USER_HEADER),
        ])
}

/// Build the router with every route and layer.
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/admin/items/pending", get(handlers::pending_items))
        .route("/api/admin/items/{id}/moderate", post(handlers::moderate_item))
        .route("/api/admin/matching/run", post(handlers::run_matching))
        .route_layer(from_fn_with_state(state.clone(), auth::require_api_key));

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Pages
        .route("/api/home", get(handlers::home))
        .route("/api/dashboard", get(handlers::dashboard))
        .route("/api/statistics", get(handlers::statistics))
        .route("/api/success-dashboard", get(handlers::success_dashboard))
        .route("/api/items-by-date", get(handlers::items_by_date))
        // Users
        .route("/api/users", post(handlers::register_user))
        // Items
        .route("/api/items", get(handlers::list_items))
        .route("/api/items/lost", post(handlers::report_lost))
        .route("/api/items/found", post(handlers::report_found))
        .route(
            "/api/items/{id}",
            get(handlers::item_detail)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/api/items/{id}/share", get(handlers::share_item))
        .route("/api/items/{id}/claim", post(handlers::claim_item))
        .route("/api/items/{id}/return", post(handlers::mark_returned))
        // Claims
        .route("/api/claims/{id}/approve", post(handlers::approve_claim))
        .route("/api/claims/{id}/reject", post(handlers::reject_claim))
        // Admin
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(from_fn_with_state(state.clone(), auth::rate_limit)),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(catalog: Catalog, config: ServerConfig) -> Result<(), String> {
    let addr = config.bind_addr()?;
    if config.api_key.is_none() {
        warn!("LOSTFOUND_API_KEY is not set, admin routes are disabled");
    }
    let app = create_router(AppState::new(catalog, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("Server error: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
