//! REST API handlers for the designer server
//!
//! Every mutation answers 200 with `{applied, reason}`: a rejected
//! operation is a no-op on the store, not an HTTP error. Change events are
//! sequenced while the write lock is still held, so a reader never sees a
//! mutation without its sequence number.

use std::fmt::Display;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use netdesign_core::{
    Activation, Connection, Layer, LayerConfig, LayerId, LayerKind, LayerPatch, LayerShapes,
    NetworkDocument, Outcome, Position, Shape,
};
use serde::{Deserialize, Serialize};

use crate::ServerState;

/// Outcome of a mutation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationResponse {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<LayerId>,
}

impl MutationResponse {
    pub fn applied() -> Self {
        MutationResponse {
            applied: true,
            reason: None,
            layer_id: None,
        }
    }

    pub fn rejected(reason: impl Display) -> Self {
        MutationResponse {
            applied: false,
            reason: Some(reason.to_string()),
            layer_id: None,
        }
    }

    fn from_outcome<T>(outcome: &Outcome<T>) -> Self {
        match outcome {
            Ok(_) => Self::applied(),
            Err(reason) => Self::rejected(reason),
        }
    }
}

/// Body of `POST /api/layers`. Unset fields fall back to registry defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLayerRequest {
    #[serde(rename = "type")]
    pub kind: LayerKind,
    #[serde(default)]
    pub id: Option<LayerId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub units: Option<u32>,
    #[serde(default)]
    pub activation: Option<Activation>,
    #[serde(default)]
    pub config: Option<LayerConfig>,
    /// Drop position on the canvas.
    #[serde(default)]
    pub position: Option<Position>,
}

impl NewLayerRequest {
    pub fn into_layer(self) -> (Layer, Option<Position>) {
        let mut layer = Layer::from_kind(self.kind);
        if let Some(id) = self.id {
            layer.id = id;
        }
        if let Some(name) = self.name {
            layer.name = name;
        }
        if self.units.is_some() {
            layer.units = self.units;
        }
        if self.activation.is_some() {
            layer.activation = self.activation;
        }
        layer.config = self.config;
        (layer, self.position)
    }
}

/// Input/output shape of one layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeResponse {
    pub id: LayerId,
    pub input: Shape,
    pub output: Shape,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Current network as an export document
pub async fn export_network(State(state): State<Arc<ServerState>>) -> Json<NetworkDocument> {
    Json(state.network.read().await.export_network())
}

/// Replace the network with the posted document
pub async fn import_network(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Json<MutationResponse> {
    let mut network = state.network.write().await;
    match network.import_json(&body) {
        Ok(()) => {
            state.notify("import_network", Vec::new());
            Json(MutationResponse::applied())
        }
        Err(e) => Json(MutationResponse::rejected(e)),
    }
}

pub async fn add_layer(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<NewLayerRequest>,
) -> Json<MutationResponse> {
    let (layer, position) = request.into_layer();
    let mut network = state.network.write().await;
    let outcome = network.add_layer(layer);
    if let (Ok(id), Some(position)) = (&outcome, position) {
        network.update_position(id, position);
    }
    match outcome {
        Ok(id) => {
            state.notify("add_layer", vec![id.clone()]);
            Json(MutationResponse {
                layer_id: Some(id),
                ..MutationResponse::applied()
            })
        }
        Err(reason) => Json(MutationResponse::rejected(reason)),
    }
}

pub async fn remove_layer(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Json<MutationResponse> {
    let id = LayerId::from(id);
    let mut network = state.network.write().await;
    let outcome = network.remove_layer(&id);
    if outcome.is_ok() {
        state.notify("remove_layer", vec![id]);
    }
    Json(MutationResponse::from_outcome(&outcome))
}

pub async fn update_layer(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(patch): Json<LayerPatch>,
) -> Json<MutationResponse> {
    let id = LayerId::from(id);
    let mut network = state.network.write().await;
    let outcome = network.update_layer(&id, patch);
    if outcome.is_ok() {
        state.notify("update_layer", vec![id]);
    }
    Json(MutationResponse::from_outcome(&outcome))
}

pub async fn update_layer_config(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(patch): Json<LayerConfig>,
) -> Json<MutationResponse> {
    let id = LayerId::from(id);
    let mut network = state.network.write().await;
    let outcome = network.update_layer_config(&id, &patch);
    if outcome.is_ok() {
        state.notify("update_layer_config", vec![id]);
    }
    Json(MutationResponse::from_outcome(&outcome))
}

pub async fn update_position(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(position): Json<Position>,
) -> Json<MutationResponse> {
    let id = LayerId::from(id);
    let mut network = state.network.write().await;
    network.update_position(&id, position);
    state.notify("update_position", vec![id]);
    Json(MutationResponse::applied())
}

pub async fn add_connection(
    State(state): State<Arc<ServerState>>,
    Json(conn): Json<Connection>,
) -> Json<MutationResponse> {
    let ids = vec![conn.from.clone(), conn.to.clone()];
    let mut network = state.network.write().await;
    let outcome = network.add_connection(conn);
    if outcome.is_ok() {
        state.notify("add_connection", ids);
    }
    Json(MutationResponse::from_outcome(&outcome))
}

pub async fn remove_connection(
    State(state): State<Arc<ServerState>>,
    Json(conn): Json<Connection>,
) -> Json<MutationResponse> {
    let mut network = state.network.write().await;
    let outcome = network.remove_connection(&conn.from, &conn.to);
    if outcome.is_ok() {
        state.notify("remove_connection", vec![conn.from, conn.to]);
    }
    Json(MutationResponse::from_outcome(&outcome))
}

/// Read-only probe; never mutates.
pub async fn validate_connection(
    State(state): State<Arc<ServerState>>,
    Json(conn): Json<Connection>,
) -> Json<MutationResponse> {
    let outcome = state
        .network
        .read()
        .await
        .validate_connection(&conn.from, &conn.to);
    Json(MutationResponse::from_outcome(&outcome))
}

pub async fn layer_shape(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<ShapeResponse>, StatusCode> {
    let id = LayerId::from(id);
    let network = state.network.read().await;
    match (network.input_shape(&id), network.output_shape(&id)) {
        (Some(input), Some(output)) => Ok(Json(ShapeResponse { id, input, output })),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

pub async fn all_shapes(State(state): State<Arc<ServerState>>) -> Json<Vec<LayerShapes>> {
    Json(state.network.read().await.layer_shapes())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    Json(health)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netdesign_core::NetworkGraph;

    fn state() -> Arc<ServerState> {
        Arc::new(ServerState::new(NetworkGraph::new()))
    }

    async fn add(state: &Arc<ServerState>, kind: LayerKind, id: &str, units: Option<u32>) {
        let request = NewLayerRequest {
            kind,
            id: Some(LayerId::from(id)),
            name: None,
            units,
            activation: None,
            config: None,
            position: None,
        };
        let Json(resp) = add_layer(State(Arc::clone(state)), Json(request)).await;
        assert!(resp.applied, "{:?}", resp.reason);
    }

    #[tokio::test]
    async fn test_health_check() {
        let _response = health_check().await;
    }

    #[tokio::test]
    async fn test_add_layer_uses_defaults_and_position() {
        let state = state();
        let request: NewLayerRequest = serde_json::from_str(
            r#"{"type": "dense", "position": {"x": 12.0, "y": 30.0}}"#,
        )
        .unwrap();
        let Json(resp) = add_layer(State(Arc::clone(&state)), Json(request)).await;
        assert!(resp.applied);
        let id = resp.layer_id.unwrap();

        let network = state.network.read().await;
        let layer = network.layer(&id).unwrap();
        assert_eq!(layer.units, Some(128));
        assert_eq!(layer.activation, Some(Activation::Relu));
        assert_eq!(network.position(&id), Some(Position::new(12.0, 30.0)));
        assert_eq!(state.sequence(), 1);
    }

    #[tokio::test]
    async fn test_rejected_connection_reports_reason() {
        let state = state();
        add(&state, LayerKind::Dense, "d", Some(8)).await;
        add(&state, LayerKind::Input, "in", Some(4)).await;

        let Json(resp) = add_connection(
            State(Arc::clone(&state)),
            Json(Connection::new("d", "in")),
        )
        .await;
        assert!(!resp.applied);
        assert_eq!(
            resp.reason.as_deref(),
            Some("input layer in accepts no incoming connection")
        );
        assert_eq!(state.network.read().await.connection_count(), 0);
        // two layer adds, no connection event
        assert_eq!(state.sequence(), 2);
    }

    #[tokio::test]
    async fn test_validate_probe_does_not_mutate() {
        let state = state();
        add(&state, LayerKind::Input, "in", Some(4)).await;
        add(&state, LayerKind::Dense, "d", Some(8)).await;

        let Json(resp) = validate_connection(
            State(Arc::clone(&state)),
            Json(Connection::new("in", "d")),
        )
        .await;
        assert!(resp.applied);
        assert_eq!(state.network.read().await.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_layer_shape_endpoint() {
        let state = state();
        add(&state, LayerKind::Input, "in", Some(784)).await;
        add(&state, LayerKind::Dense, "d", Some(128)).await;
        let Json(resp) = add_connection(
            State(Arc::clone(&state)),
            Json(Connection::new("in", "d")),
        )
        .await;
        assert!(resp.applied);

        let Json(shape) = layer_shape(State(Arc::clone(&state)), Path("d".to_string()))
            .await
            .unwrap();
        assert_eq!(shape.input, Shape::new(vec![784]));
        assert_eq!(shape.output, Shape::new(vec![128]));

        let missing = layer_shape(State(Arc::clone(&state)), Path("nope".to_string())).await;
        assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_import_round_trip_and_bad_document() {
        let state = state();
        add(&state, LayerKind::Input, "in", Some(10)).await;
        let Json(doc) = export_network(State(Arc::clone(&state))).await;

        let Json(resp) = import_network(State(Arc::clone(&state)), "{broken".to_string()).await;
        assert!(!resp.applied);
        assert!(resp.reason.unwrap().starts_with("malformed network document"));

        let json = serde_json::to_string(&doc).unwrap();
        let Json(resp) = import_network(State(Arc::clone(&state)), json).await;
        assert!(resp.applied);
        assert_eq!(state.network.read().await.export_network(), doc);
    }

    #[tokio::test]
    async fn test_remove_layer_endpoint() {
        let state = state();
        add(&state, LayerKind::Dense, "d", None).await;
        let Json(resp) = remove_layer(State(Arc::clone(&state)), Path("d".to_string())).await;
        assert!(resp.applied);
        let Json(resp) = remove_layer(State(Arc::clone(&state)), Path("d".to_string())).await;
        assert!(!resp.applied);
        assert!(state.network.read().await.is_empty());
    }
}
