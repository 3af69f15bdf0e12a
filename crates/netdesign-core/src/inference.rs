//! Shape inference over the current graph state
//!
//! Nothing is cached across queries: every query walks the incoming
//! connections again. Within one query each layer's output is resolved
//! once, so fan-in merges stay linear in the size of the graph. The walk
//! also tracks the layers on the current path, so a cycle that slipped
//! past the validator (e.g. through an imported document) resolves to the
//! unknown shape instead of recursing forever.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::graph::NetworkGraph;
use crate::model::{Layer, LayerId};
use crate::registry::{OutputRule, Role};
use crate::shape::Shape;

/// Inferred shapes for one layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerShapes {
    pub id: LayerId,
    pub input: Shape,
    pub output: Shape,
}

/// State of a single inference query.
#[derive(Debug, Default)]
struct Walk {
    /// Layers currently being resolved.
    path: HashSet<LayerId>,
    /// Outputs already resolved during this query.
    resolved: HashMap<LayerId, Shape>,
}

impl NetworkGraph {
    /// Effective input shape, or `None` for an unknown layer id.
    pub fn input_shape(&self, id: &LayerId) -> Option<Shape> {
        let layer = self.layer(id)?;
        Some(self.resolve_input(layer, &mut Walk::default()))
    }

    /// Effective output shape, or `None` for an unknown layer id.
    pub fn output_shape(&self, id: &LayerId) -> Option<Shape> {
        self.layer(id)?;
        Some(self.resolve_output(id, &mut Walk::default()))
    }

    /// Input and output shapes for every layer, in insertion order.
    pub fn layer_shapes(&self) -> Vec<LayerShapes> {
        let mut walk = Walk::default();
        self.layers
            .iter()
            .map(|layer| {
                let input = self.resolve_input(layer, &mut walk);
                let output = apply_output_rule(layer, input.clone());
                LayerShapes {
                    id: layer.id.clone(),
                    input,
                    output,
                }
            })
            .collect()
    }

    fn resolve_input(&self, layer: &Layer, walk: &mut Walk) -> Shape {
        let predecessors: Vec<&LayerId> = self.incoming(&layer.id).map(|c| &c.from).collect();

        match predecessors.as_slice() {
            [] => self.source_default(layer),
            [single] => self.resolve_output(single, walk),
            [first, ..] => match self.rules.merge_rule(layer.kind) {
                Some(rule) => {
                    let inputs: Vec<Shape> = predecessors
                        .iter()
                        .map(|pred| self.resolve_output(pred, walk))
                        .collect();
                    rule.combine(layer, &inputs).unwrap_or_else(Shape::unknown)
                }
                None => self.resolve_output(first, walk),
            },
        }
    }

    fn resolve_output(&self, id: &LayerId, walk: &mut Walk) -> Shape {
        if let Some(shape) = walk.resolved.get(id) {
            return shape.clone();
        }
        let Some(layer) = self.layer(id) else {
            return Shape::unknown();
        };
        if !walk.path.insert(id.clone()) {
            warn!("Cycle through layer {} during shape inference", id);
            return Shape::unknown();
        }
        let input = self.resolve_input(layer, walk);
        walk.path.remove(id);
        let output = apply_output_rule(layer, input);
        walk.resolved.insert(id.clone(), output.clone());
        output
    }

    /// Input shape of a layer nothing feeds.
    fn source_default(&self, layer: &Layer) -> Shape {
        let info = layer.kind.info();
        if info.role == Role::Source {
            Shape::new(vec![layer.units.unwrap_or(0) as usize])
        } else if info.receptive {
            self.rules.receptive_default().clone()
        } else {
            Shape::unknown()
        }
    }
}

fn apply_output_rule(layer: &Layer, input: Shape) -> Shape {
    match layer.kind.info().output_rule {
        OutputRule::Units => Shape::new(vec![layer.units.unwrap_or(0) as usize]),
        OutputRule::Flatten if input.is_unknown() => Shape::unknown(),
        OutputRule::Flatten => Shape::new(vec![input.numel()]),
        OutputRule::Passthrough => input,
    }
}
