//! Route definitions for the roast import API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - roast import
        .nest("/roasts", roast_routes(state))
}

/// Roast import routes (protected)
fn roast_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/import", post(handlers::import_roast))
        .route("/:roast_id", get(handlers::get_roast))
        .route("/:roast_id/import", put(handlers::reimport_roast))
        .route("/:roast_id/data", delete(handlers::clear_roast_data))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
