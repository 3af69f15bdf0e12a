//! Connection validation

use petgraph::algo::has_path_connecting;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{NetworkGraph, Outcome};
use crate::model::LayerId;
use crate::shape::Shape;

/// How far the validator looks for cycles a new edge would close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Direct back-edge, or a two-edge loop through both endpoints.
    #[default]
    Local,
    /// Any existing path from the target back to the source.
    Full,
}

/// Why a store operation left the graph unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("layer {0} does not exist")]
    UnknownLayer(LayerId),

    #[error("layer {0} already exists")]
    DuplicateLayer(LayerId),

    #[error("layer {0} must have a positive unit count")]
    ZeroUnits(LayerId),

    #[error("layer {0} cannot connect to itself")]
    SelfLoop(LayerId),

    #[error("input layer {0} accepts no incoming connection")]
    IntoSource(LayerId),

    #[error("output layer {0} emits no outgoing connection")]
    OutOfSink(LayerId),

    #[error("connection {from} -> {to} already exists")]
    Duplicate { from: LayerId, to: LayerId },

    #[error("connection {from} -> {to} would close a cycle")]
    WouldCycle { from: LayerId, to: LayerId },

    #[error("rank mismatch: {from} produces {produced}, {to} expects {expected}")]
    RankMismatch {
        from: LayerId,
        to: LayerId,
        produced: Shape,
        expected: Shape,
    },

    #[error("no connection from {from} to {to}")]
    MissingConnection { from: LayerId, to: LayerId },
}

impl NetworkGraph {
    /// Read-only probe: would `add_connection(from -> to)` be accepted?
    pub fn validate_connection(&self, from: &LayerId, to: &LayerId) -> Outcome {
        let Some(source) = self.layer(from) else {
            return Err(Rejection::UnknownLayer(from.clone()));
        };
        let Some(target) = self.layer(to) else {
            return Err(Rejection::UnknownLayer(to.clone()));
        };
        if from == to {
            return Err(Rejection::SelfLoop(from.clone()));
        }
        if target.kind.is_source() {
            return Err(Rejection::IntoSource(to.clone()));
        }
        if source.kind.is_sink() {
            return Err(Rejection::OutOfSink(from.clone()));
        }
        if self.has_connection(from, to) {
            return Err(Rejection::Duplicate {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if self.closes_cycle(from, to) {
            return Err(Rejection::WouldCycle {
                from: from.clone(),
                to: to.clone(),
            });
        }

        let produced = self.output_shape(from).unwrap_or_else(Shape::unknown);
        let expected = self.input_shape(to).unwrap_or_else(Shape::unknown);
        if !produced.rank_compatible(&expected) {
            return Err(Rejection::RankMismatch {
                from: from.clone(),
                to: to.clone(),
                produced,
                expected,
            });
        }
        Ok(())
    }

    fn closes_cycle(&self, from: &LayerId, to: &LayerId) -> bool {
        match self.cycle_policy {
            CyclePolicy::Local => {
                self.has_connection(to, from)
                    || self
                        .outgoing(to)
                        .any(|hop| self.has_connection(&hop.to, from))
            }
            CyclePolicy::Full => {
                let mut topology = self.topology();
                topology.add_node(from.as_str());
                topology.add_node(to.as_str());
                has_path_connecting(&topology, to.as_str(), from.as_str(), None)
            }
        }
    }
}
