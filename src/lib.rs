pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::Authenticator;
use crate::config::AppConfig;
use crate::database::store::DrinkStore;

/// Shared application state, constructed once at startup and injected into
/// every handler. No module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: DrinkStore,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(config: AppConfig, store: DrinkStore) -> Self {
        let auth = Arc::new(Authenticator::new(&config.auth));
        Self {
            config: Arc::new(config),
            store,
            auth,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/drinks", get(handlers::drinks::list).post(handlers::drinks::create))
        .route("/drinks-detail", get(handlers::drinks::list_detail))
        .route(
            "/drinks/:drink_id",
            patch(handlers::drinks::update).delete(handlers::drinks::remove),
        )
        .fallback(handlers::not_found)
        .layer(axum::middleware::map_response(middleware::errors::json_error_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
