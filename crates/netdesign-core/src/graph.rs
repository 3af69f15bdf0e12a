//! The graph store: sole owner of layers, connections and positions

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::DesignerConfig;
use crate::model::*;
use crate::registry::Role;
use crate::shape::ShapeRules;
use crate::validate::{CyclePolicy, Rejection};

/// Result of a store mutation. A rejection never changes state.
pub type Outcome<T = ()> = Result<T, Rejection>;

/// The network design graph. Layers and connections keep insertion order.
pub struct NetworkGraph {
    pub(crate) layers: Vec<Layer>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) positions: BTreeMap<LayerId, Position>,
    pub(crate) rules: ShapeRules,
    pub(crate) cycle_policy: CyclePolicy,
}

impl std::fmt::Debug for NetworkGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkGraph")
            .field("layer_count", &self.layers.len())
            .field("connection_count", &self.connections.len())
            .field("cycle_policy", &self.cycle_policy)
            .finish()
    }
}

impl NetworkGraph {
    pub fn new() -> Self {
        NetworkGraph {
            layers: Vec::new(),
            connections: Vec::new(),
            positions: BTreeMap::new(),
            rules: ShapeRules::default(),
            cycle_policy: CyclePolicy::default(),
        }
    }

    /// Empty graph using the validation and shape settings from `config`.
    pub fn with_config(config: &DesignerConfig) -> Self {
        NetworkGraph {
            rules: config.shapes.rules(),
            cycle_policy: config.validation.cycle_policy,
            ..Self::new()
        }
    }

    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    pub fn set_cycle_policy(&mut self, policy: CyclePolicy) {
        self.cycle_policy = policy;
    }

    pub fn rules(&self) -> &ShapeRules {
        &self.rules
    }

    /// Mutable access to the merge dispatch table.
    pub fn rules_mut(&mut self) -> &mut ShapeRules {
        &mut self.rules
    }

    // ── Mutations ───────────────────────────────────────────

    /// Insert a layer. An empty id is replaced by a fresh one; a unit count
    /// of zero is rejected. Also
    /// registers a `(0, 0)` position unless one was pre-registered.
    pub fn add_layer(&mut self, mut layer: Layer) -> Outcome<LayerId> {
        if layer.id.is_empty() {
            layer.id = LayerId::generate();
        }
        if self.contains(&layer.id) {
            debug!("add_layer ignored: {} already exists", layer.id);
            return Err(Rejection::DuplicateLayer(layer.id));
        }
        if layer.units == Some(0) {
            debug!("add_layer ignored: {} has zero units", layer.id);
            return Err(Rejection::ZeroUnits(layer.id));
        }
        let id = layer.id.clone();
        debug!("Adding {} layer {} ({})", layer.kind, id, layer.name);
        self.positions.entry(id.clone()).or_default();
        self.layers.push(layer);
        Ok(id)
    }

    /// Remove a layer together with every connection touching it and its
    /// position entry.
    pub fn remove_layer(&mut self, id: &LayerId) -> Outcome<Layer> {
        let Some(index) = self.index_of(id) else {
            debug!("remove_layer ignored: {} not found", id);
            return Err(Rejection::UnknownLayer(id.clone()));
        };
        let layer = self.layers.remove(index);
        let before = self.connections.len();
        self.connections.retain(|conn| !conn.touches(id));
        self.positions.remove(id);
        debug!(
            "Removed layer {} and {} connection(s)",
            id,
            before - self.connections.len()
        );
        Ok(layer)
    }

    /// Merge `patch` into an existing layer. A kind change that would
    /// leave an input layer with incoming edges, or an output layer with
    /// outgoing edges, is rejected.
    pub fn update_layer(&mut self, id: &LayerId, patch: LayerPatch) -> Outcome {
        let Some(index) = self.index_of(id) else {
            debug!("update_layer ignored: {} not found", id);
            return Err(Rejection::UnknownLayer(id.clone()));
        };
        if patch.units == Some(Some(0)) {
            debug!("update_layer ignored: zero units for {}", id);
            return Err(Rejection::ZeroUnits(id.clone()));
        }
        if let Some(kind) = patch.kind {
            match kind.role() {
                Role::Source if self.incoming(id).next().is_some() => {
                    debug!("update_layer ignored: {} has incoming connections", id);
                    return Err(Rejection::IntoSource(id.clone()));
                }
                Role::Sink if self.outgoing(id).next().is_some() => {
                    debug!("update_layer ignored: {} has outgoing connections", id);
                    return Err(Rejection::OutOfSink(id.clone()));
                }
                _ => {}
            }
        }
        patch.apply(&mut self.layers[index]);
        Ok(())
    }

    /// Shallow-merge `patch` into the layer's config block, creating it if
    /// absent.
    pub fn update_layer_config(&mut self, id: &LayerId, patch: &LayerConfig) -> Outcome {
        let Some(layer) = self.layer_mut(id) else {
            debug!("update_layer_config ignored: {} not found", id);
            return Err(Rejection::UnknownLayer(id.clone()));
        };
        layer.config.get_or_insert_with(LayerConfig::default).merge(patch);
        Ok(())
    }

    /// Append a connection if the validator accepts it.
    pub fn add_connection(&mut self, conn: Connection) -> Outcome {
        if let Err(reason) = self.validate_connection(&conn.from, &conn.to) {
            debug!("Connection {} -> {} rejected: {}", conn.from, conn.to, reason);
            return Err(reason);
        }
        debug!("Adding connection {} -> {}", conn.from, conn.to);
        self.connections.push(conn);
        Ok(())
    }

    pub fn remove_connection(&mut self, from: &LayerId, to: &LayerId) -> Outcome<Connection> {
        match self
            .connections
            .iter()
            .position(|c| &c.from == from && &c.to == to)
        {
            Some(index) => Ok(self.connections.remove(index)),
            None => Err(Rejection::MissingConnection {
                from: from.clone(),
                to: to.clone(),
            }),
        }
    }

    /// Unconditional upsert; `id` need not name a layer yet.
    pub fn update_position(&mut self, id: &LayerId, position: Position) {
        self.positions.insert(id.clone(), position);
    }

    /// Drop everything, keeping configuration.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.connections.clear();
        self.positions.clear();
    }

    // ── Queries ─────────────────────────────────────────────

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn position(&self, id: &LayerId) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &BTreeMap<LayerId, Position> {
        &self.positions
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.connections.is_empty() && self.positions.is_empty()
    }

    pub fn has_connection(&self, from: &LayerId, to: &LayerId) -> bool {
        self.connections
            .iter()
            .any(|c| &c.from == from && &c.to == to)
    }

    /// Connections ending at `id`, in insertion order.
    pub fn incoming<'a>(&'a self, id: &'a LayerId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| &c.to == id)
    }

    /// Connections starting at `id`, in insertion order.
    pub fn outgoing<'a>(&'a self, id: &'a LayerId) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| &c.from == id)
    }

    /// Layer/connection topology as a petgraph map keyed by id.
    pub(crate) fn topology(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for layer in &self.layers {
            graph.add_node(layer.id.as_str());
        }
        for conn in &self.connections {
            graph.add_edge(conn.from.as_str(), conn.to.as_str(), ());
        }
        graph
    }

    /// Layer ids in dependency order, or `None` if the connections contain
    /// a cycle.
    pub fn topological_order(&self) -> Option<Vec<LayerId>> {
        let topology = self.topology();
        match toposort(&topology, None) {
            Ok(order) => Some(order.into_iter().map(LayerId::from).collect()),
            Err(cycle) => {
                debug!("Topological sort found a cycle at {}", cycle.node_id());
                None
            }
        }
    }
}

impl Default for NetworkGraph {
    fn default() -> Self {
        Self::new()
    }
}
