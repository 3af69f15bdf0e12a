//! Netdesign Core — network graph model, shape inference, validation and serialization

pub mod model;
pub mod registry;
pub mod shape;
pub mod graph;
pub mod inference;
pub mod validate;
pub mod document;
pub mod config;
pub mod persist;


#[cfg(test)]
pub mod test_utils;

pub use model::{LayerId, Layer, LayerConfig, LayerPatch, Activation, Padding, PoolType, Connection, Position};
pub use registry::{LayerKind, KindInfo, Role, OutputRule, UnknownKind};
pub use shape::{Shape, MergeRule, ConcatRule, ElementwiseRule, ShapeRules};
pub use graph::{NetworkGraph, Outcome};
pub use inference::LayerShapes;
pub use validate::{CyclePolicy, Rejection};
pub use document::{NetworkDocument, ImportError};
pub use config::{DesignerConfig, ConfigError};
pub use persist::{save_network, load_network, read_document};
