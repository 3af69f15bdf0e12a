//! Axum router setup for the designer server

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::{handlers::*, websocket::ws_handler, ServerState};

/// Create the axum router with all routes
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // WebSocket endpoint for change notifications
        .route("/ws", get(ws_handler))
        // Whole-document export/import
        .route("/api/network", get(export_network).put(import_network))
        .route("/api/shapes", get(all_shapes))
        // Layers
        .route("/api/layers", post(add_layer))
        .route("/api/layers/:id", patch(update_layer).delete(remove_layer))
        .route("/api/layers/:id/config", patch(update_layer_config))
        .route("/api/layers/:id/position", put(update_position))
        .route("/api/layers/:id/shape", get(layer_shape))
        // Connections
        .route("/api/connections", post(add_connection).delete(remove_connection))
        .route("/api/connections/validate", post(validate_connection))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};
    use netdesign_core::NetworkGraph;

    #[test]
    fn test_router_creation() {
        let state = Arc::new(ServerState::new(NetworkGraph::new()));
        let _router = create_router(state);
    }

    #[test]
    fn test_health_check_ok() {
        let response = tokio_test::block_on(health_check()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
