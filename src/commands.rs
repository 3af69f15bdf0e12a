//! CLI command implementations

use std::path::{Path, PathBuf};

use netdesign_core::{
    read_document, save_network, Activation, Connection, DesignerConfig, Layer, LayerKind,
    NetworkDocument, NetworkGraph, Position,
};
use netdesign_server::{NetDesignServer, ServerConfig};

/// Horizontal spacing between layers in the starter design.
const INIT_SPACING: f64 = 220.0;

pub async fn serve(
    config: DesignerConfig,
    host: Option<String>,
    port: Option<u16>,
    load: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut graph = NetworkGraph::with_config(&config);
    if let Some(path) = &load {
        netdesign_core::load_network(&mut graph, path)?;
        tracing::info!(
            "Loaded {} layers, {} connections from {}",
            graph.layer_count(),
            graph.connection_count(),
            path.display()
        );
    }

    let mut server_config = ServerConfig::from(&config.server);
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }
    tracing::info!(
        "Starting designer server on {}:{}",
        server_config.host,
        server_config.port
    );

    NetDesignServer::new(graph, server_config).start().await
}

pub fn inspect(config: &DesignerConfig, file: &Path) -> anyhow::Result<()> {
    let mut graph = NetworkGraph::with_config(config);
    graph.import_network(read_document(file)?)?;

    let order = match graph.topological_order() {
        Some(order) => order,
        None => {
            tracing::warn!("Design contains a cycle; listing layers in file order");
            graph.layers().iter().map(|l| l.id.clone()).collect()
        }
    };

    println!(
        "{} layers, {} connections",
        graph.layer_count(),
        graph.connection_count()
    );
    for id in order {
        let Some(layer) = graph.layer(&id) else { continue };
        let input = graph.input_shape(&id).unwrap_or_default();
        let output = graph.output_shape(&id).unwrap_or_default();
        let activation = layer
            .activation
            .map(|a| a.as_str())
            .unwrap_or("-");
        println!(
            "{:<24} {:<10} {:<8} in={:<16} out={}",
            layer.name,
            layer.kind,
            activation,
            input.to_string(),
            output
        );
    }
    Ok(())
}

pub fn check(config: &DesignerConfig, file: &Path) -> anyhow::Result<()> {
    let doc = read_document(file)?;
    let NetworkDocument {
        layers,
        connections,
        positions,
    } = doc;

    let mut graph = NetworkGraph::with_config(config);
    graph.import_network(NetworkDocument {
        layers,
        connections: Vec::new(),
        positions,
    })?;

    let total = connections.len();
    let mut rejected = 0;
    for conn in connections {
        let label = format!("{} -> {}", conn.from, conn.to);
        if let Err(reason) = graph.add_connection(conn) {
            println!("rejected {}: {}", label, reason);
            rejected += 1;
        }
    }

    if rejected > 0 {
        anyhow::bail!("{} of {} connections rejected", rejected, total);
    }
    println!("{} connections valid", total);
    Ok(())
}

pub fn init(file: &Path, force: bool) -> anyhow::Result<()> {
    if file.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", file.display());
    }

    let mut graph = NetworkGraph::new();
    let layers = [
        Layer::from_kind(LayerKind::Input),
        Layer::from_kind(LayerKind::Dense),
        Layer::from_kind(LayerKind::Dense).with_units(64),
        Layer::from_kind(LayerKind::Output).with_activation(Activation::Softmax),
    ];

    let mut previous = None;
    for (i, layer) in layers.into_iter().enumerate() {
        let id = graph.add_layer(layer)?;
        graph.update_position(&id, Position::new(i as f64 * INIT_SPACING, 0.0));
        if let Some(prev) = previous.replace(id.clone()) {
            graph.add_connection(Connection::new(prev, id))?;
        }
    }

    save_network(&graph, file)?;
    tracing::info!("Starter design written to {}", file.display());
    Ok(())
}
