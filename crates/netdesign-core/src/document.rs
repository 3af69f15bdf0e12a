//! Export/import of the whole graph as one portable document

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::graph::NetworkGraph;
use crate::model::{Connection, Layer, LayerId, Position};
use crate::registry::LayerKind;

/// Snapshot of the full graph aggregate. There is no version field; the
/// shape of this struct is the format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDocument {
    pub layers: Vec<Layer>,
    pub connections: Vec<Connection>,
    pub positions: BTreeMap<LayerId, Position>,
}

/// Why an import was refused. The graph is untouched in every case.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed network document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate layer id {0}")]
    DuplicateLayer(LayerId),

    #[error("connection {from} -> {to} references a missing layer")]
    DanglingConnection { from: LayerId, to: LayerId },

    #[error("connection on layer {0} loops back to itself")]
    SelfLoop(LayerId),

    #[error("connection {from} -> {to} appears more than once")]
    DuplicateConnection { from: LayerId, to: LayerId },

    #[error("connection {from} -> {to} breaks the role of {kind} layer {layer}")]
    EndpointRole {
        from: LayerId,
        to: LayerId,
        layer: LayerId,
        kind: LayerKind,
    },

    #[error("layer {0} has zero units")]
    ZeroUnits(LayerId),
}

impl NetworkDocument {
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Structural checks serde cannot express.
    fn check(&self) -> Result<(), ImportError> {
        let mut kinds = HashMap::with_capacity(self.layers.len());
        for layer in &self.layers {
            if kinds.insert(&layer.id, layer.kind).is_some() {
                return Err(ImportError::DuplicateLayer(layer.id.clone()));
            }
            if layer.units == Some(0) {
                return Err(ImportError::ZeroUnits(layer.id.clone()));
            }
        }

        let mut seen = HashSet::with_capacity(self.connections.len());
        for conn in &self.connections {
            let (Some(&from_kind), Some(&to_kind)) = (kinds.get(&conn.from), kinds.get(&conn.to))
            else {
                return Err(ImportError::DanglingConnection {
                    from: conn.from.clone(),
                    to: conn.to.clone(),
                });
            };
            if conn.from == conn.to {
                return Err(ImportError::SelfLoop(conn.from.clone()));
            }
            let role_breaker = if from_kind.is_sink() {
                Some((&conn.from, from_kind))
            } else if to_kind.is_source() {
                Some((&conn.to, to_kind))
            } else {
                None
            };
            if let Some((layer, kind)) = role_breaker {
                return Err(ImportError::EndpointRole {
                    from: conn.from.clone(),
                    to: conn.to.clone(),
                    layer: layer.clone(),
                    kind,
                });
            }
            if !seen.insert((&conn.from, &conn.to)) {
                return Err(ImportError::DuplicateConnection {
                    from: conn.from.clone(),
                    to: conn.to.clone(),
                });
            }
        }
        Ok(())
    }
}

impl NetworkGraph {
    /// Snapshot of layers, connections and positions.
    pub fn export_network(&self) -> NetworkDocument {
        NetworkDocument {
            layers: self.layers.clone(),
            connections: self.connections.clone(),
            positions: self.positions.clone(),
        }
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        self.export_network().to_json()
    }

    /// Replace the whole aggregate with `doc`. Connections are checked for
    /// dangling ends, self-loops, duplicates and endpoint roles, but not
    /// replayed through the shape or cycle checks. Layers without a
    /// position get `(0, 0)`.
    pub fn import_network(&mut self, doc: NetworkDocument) -> Result<(), ImportError> {
        if let Err(e) = doc.check() {
            warn!("Network import rejected: {}", e);
            return Err(e);
        }
        let NetworkDocument {
            layers,
            connections,
            mut positions,
        } = doc;
        for layer in &layers {
            positions.entry(layer.id.clone()).or_default();
        }
        info!(
            "Imported network with {} layers, {} connections",
            layers.len(),
            connections.len()
        );
        self.layers = layers;
        self.connections = connections;
        self.positions = positions;
        Ok(())
    }

    /// Parse and import in one step.
    pub fn import_json(&mut self, json: &str) -> Result<(), ImportError> {
        let doc = match NetworkDocument::from_json(json) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Network import rejected: {}", e);
                return Err(e);
            }
        };
        self.import_network(doc)
    }
}
