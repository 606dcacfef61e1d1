//! Router assembly.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Extension, Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;

/// Build the proxy router. Rate limiting covers the `/api` and `/assets`
/// routes; health and metrics are always reachable.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Fire data
        .route("/api/nasa/firms", get(handlers::nasa::firms_handler))
        .route("/api/fires", get(handlers::fires::fires_handler))
        // Maps
        .route("/api/geocode", get(handlers::geocode::geocode_handler))
        .route("/api/tiles/:z/:x/:y", get(handlers::tiles::tile_handler))
        .route("/assets/*path", get(handlers::assets::asset_handler))
        // Analytics
        .route("/api/analytics", post(handlers::analytics::analytics_handler))
        // Cache control
        .route("/api/cache", post(handlers::cache::cache_control_handler))
        // Saved locations
        .route(
            "/api/locations",
            get(handlers::locations::list_locations_handler)
                .post(handlers::locations::create_location_handler),
        )
        .route(
            "/api/locations/:id",
            delete(handlers::locations::delete_location_handler),
        )
        .route_layer(middleware::from_fn(rate_limit_middleware));

    Router::new()
        .merge(api)
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
