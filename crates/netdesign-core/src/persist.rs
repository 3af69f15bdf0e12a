//! Saving and loading design documents on disk

use std::path::Path;

use anyhow::Context;

use crate::document::NetworkDocument;
use crate::graph::NetworkGraph;

/// Extension used for design files.
pub const DESIGN_EXTENSION: &str = "json";

/// Write the graph's export document as pretty JSON, creating parent
/// directories as needed.
pub fn save_network(graph: &NetworkGraph, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = graph.export_json()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

    tracing::debug!("Design saved: {}", path.display());
    Ok(())
}

/// Read a design document without touching any graph.
pub fn read_document(path: &Path) -> anyhow::Result<NetworkDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let doc = NetworkDocument::from_json(&json)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(doc)
}

/// Replace `graph` with the design stored at `path`.
pub fn load_network(graph: &mut NetworkGraph, path: &Path) -> anyhow::Result<()> {
    let doc = read_document(path)?;
    graph
        .import_network(doc)
        .with_context(|| format!("importing {}", path.display()))?;

    tracing::debug!("Design loaded from: {}", path.display());
    Ok(())
}
