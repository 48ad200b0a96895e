mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::db::Database;
use middleware::SecurityConfig;

/// Router with all security disabled. Local development and tests.
pub fn create_router(db: Database) -> Router {
    create_router_with_security(db, SecurityConfig::disabled())
}

pub fn create_router_with_security(db: Database, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Features
        .route("/features", get(handlers::list_features))
        .route("/features", post(handlers::create_feature))
        .route("/features/ranking", get(handlers::rice_ranking))
        .route("/features/backlog", get(handlers::backlog))
        .route("/features/{id}", get(handlers::get_feature))
        .route("/features/{id}", put(handlers::update_feature))
        .route("/features/{id}", delete(handlers::delete_feature))
        // OKRs
        .route("/okrs", get(handlers::list_okrs))
        .route("/okrs", post(handlers::create_okr))
        .route("/okrs/tree", get(handlers::objective_tree))
        .route("/okrs/{id}", get(handlers::get_okr))
        .route("/okrs/{id}", put(handlers::update_okr))
        // Sprints
        .route("/sprints", get(handlers::list_sprints))
        .route("/sprints", post(handlers::create_sprint))
        .route("/sprints/{id}", get(handlers::get_sprint))
        .route("/sprints/{id}", put(handlers::update_sprint))
        .route("/sprints/{id}/features", get(handlers::list_sprint_features))
        // Activity
        .route("/activity", get(handlers::list_activity))
        // Dashboard
        .route("/dashboard/stats", get(handlers::dashboard_stats))
        .route("/dashboard/priority-matrix", get(handlers::priority_matrix))
        .route("/dashboard/okr-alignment", get(handlers::okr_alignment))
        .route(
            "/dashboard/status-distribution",
            get(handlers::status_distribution),
        )
        .route("/dashboard/velocity", get(handlers::velocity_series))
        .route("/dashboard/rice-breakdown", get(handlers::rice_breakdown))
        // Health
        .route("/health", get(handlers::health));

    let cors = match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::permissive(),
    };

    let mut router = Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(db);

    if let Some(limiter) = security.rate_limiter.clone() {
        router = router.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::enforce_rate_limit,
        ));
    }
    if security.api_key.is_some() {
        router = router.layer(axum::middleware::from_fn_with_state(
            security,
            middleware::require_bearer,
        ));
    }

    router
}
