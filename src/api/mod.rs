//! HTTP layer: router, shared state and handlers.

pub mod docs;
pub mod extract;
pub mod handlers;
pub mod schemas;

use crate::config::ServerConfig;
use crate::storage::SqliteStorage;
use axum::Router;
use axum::routing::get;
use schemas::ListLimits;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SqliteStorage>,
    pub limits: ListLimits,
}

impl AppState {
    #[must_use]
    pub fn new(storage: Arc<SqliteStorage>, config: &ServerConfig) -> Self {
        Self {
            storage,
            limits: ListLimits {
                default_limit: config.default_limit,
                max_limit: config.max_limit,
            },
        }
    }
}

/// Build the application router.
///
/// Issue routes answer with and without a trailing slash.
pub fn build_router(state: AppState) -> Router {
    let collection = get(handlers::list_issues).post(handlers::create_issue);
    let item = get(handlers::get_issue)
        .put(handlers::replace_issue)
        .patch(handlers::patch_issue)
        .delete(handlers::delete_issue);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(docs::openapi_json))
        .route("/docs", get(docs::swagger_ui))
        .route("/redoc", get(docs::redoc))
        .route("/issues", collection.clone())
        .route("/issues/", collection)
        .route("/issues/:id", item.clone())
        .route("/issues/:id/", item)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
