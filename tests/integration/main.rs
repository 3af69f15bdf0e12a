//! Integration tests for Netdesign
//!
//! These tests drive the core store, the server handlers and the CLI
//! binary together.

use std::process::Command;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use netdesign_core::{
    read_document, save_network, Connection, Layer, LayerKind, NetworkDocument, NetworkGraph,
    Shape,
};
use netdesign_server::handlers::{self, NewLayerRequest};
use netdesign_server::{NetDesignServer, ServerConfig, ServerState};

fn netdesign() -> Command {
    Command::new(env!("CARGO_BIN_EXE_netdesign"))
}

fn new_layer(json: &str) -> Json<NewLayerRequest> {
    Json(serde_json::from_str(json).unwrap())
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = netdesign().arg("--help").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Visual neural network architecture designer"));
}

/// `init` writes a design that `check` and `inspect` accept
#[test]
fn test_init_check_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("designs").join("starter.json");

    let status = netdesign()
        .args(["--root"])
        .arg(dir.path())
        .arg("init")
        .arg(&file)
        .status()
        .unwrap();
    assert!(status.success());

    let doc = read_document(&file).unwrap();
    assert_eq!(doc.layers.len(), 4);
    assert_eq!(doc.connections.len(), 3);
    assert_eq!(doc.positions.len(), 4);

    let output = netdesign()
        .arg("--root")
        .arg(dir.path())
        .arg("check")
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("3 connections valid"));

    let output = netdesign()
        .arg("--root")
        .arg(dir.path())
        .arg("inspect")
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4 layers, 3 connections"));
    assert!(stdout.contains("out=[10]"));

    // Refuses to overwrite without --force
    let status = netdesign()
        .arg("--root")
        .arg(dir.path())
        .arg("init")
        .arg(&file)
        .status()
        .unwrap();
    assert!(!status.success());
}

/// `check` reports connections the validator would refuse
#[test]
fn test_check_reports_rejected_connections() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.json");

    let doc = NetworkDocument {
        layers: vec![
            Layer::new("in", LayerKind::Input, "Input Layer").with_units(4),
            Layer::new("out", LayerKind::Output, "Output Layer").with_units(2),
        ],
        connections: vec![Connection::new("in", "out"), Connection::new("out", "in")],
        positions: Default::default(),
    };
    std::fs::write(&file, doc.to_json().unwrap()).unwrap();

    let output = netdesign()
        .arg("--root")
        .arg(dir.path())
        .arg("check")
        .arg(&file)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("rejected out -> in"));
}

/// Mutations through the handlers land in the shared store and are announced
#[tokio::test]
async fn test_handlers_drive_store() {
    let state = Arc::new(ServerState::new(NetworkGraph::new()));
    let mut events = state.events_tx.subscribe();

    let Json(resp) = handlers::add_layer(
        State(state.clone()),
        new_layer(r#"{"type": "input", "id": "in", "units": 12, "position": {"x": 5.0, "y": 0.0}}"#),
    )
    .await;
    assert!(resp.applied);
    let Json(resp) = handlers::add_layer(
        State(state.clone()),
        new_layer(r#"{"type": "dense", "id": "hidden"}"#),
    )
    .await;
    assert!(resp.applied);

    let Json(resp) =
        handlers::add_connection(State(state.clone()), Json(Connection::new("in", "hidden"))).await;
    assert!(resp.applied);

    // Back-edge is refused but still answers normally
    let Json(resp) =
        handlers::add_connection(State(state.clone()), Json(Connection::new("hidden", "in"))).await;
    assert!(!resp.applied);
    assert!(resp.reason.is_some());

    let shape = handlers::layer_shape(State(state.clone()), Path("hidden".to_string()))
        .await
        .unwrap();
    assert_eq!(shape.0.input, Shape::new(vec![12]));
    assert_eq!(shape.0.output, Shape::new(vec![128]));
    assert!(
        handlers::layer_shape(State(state.clone()), Path("ghost".to_string()))
            .await
            .is_err()
    );

    {
        let network = state.network.read().await;
        assert_eq!(network.layer_count(), 2);
        assert_eq!(network.connection_count(), 1);
        assert_eq!(network.position(&"in".into()).map(|p| p.x), Some(5.0));
    }

    // Three applied mutations, three events
    assert_eq!(state.sequence(), 3);
    for _ in 0..3 {
        assert!(events.try_recv().is_ok());
    }
    assert!(events.try_recv().is_err());
}

/// A design saved to disk can be loaded into a server and exported unchanged
#[tokio::test]
async fn test_saved_design_served_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("net.json");

    let mut graph = NetworkGraph::new();
    graph
        .add_layer(Layer::new("in", LayerKind::Input, "Input Layer").with_units(3))
        .unwrap();
    graph
        .add_layer(Layer::new("out", LayerKind::Output, "Output Layer").with_units(1))
        .unwrap();
    graph.add_connection(Connection::new("in", "out")).unwrap();
    save_network(&graph, &file).unwrap();

    let mut loaded = NetworkGraph::new();
    netdesign_core::load_network(&mut loaded, &file).unwrap();
    let server = NetDesignServer::new(
        loaded,
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
    );

    let Json(doc) = handlers::export_network(State(server.state())).await;
    assert_eq!(doc, graph.export_network());
}
