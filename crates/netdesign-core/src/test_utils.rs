//! Test fixtures for sample designs

use crate::graph::NetworkGraph;
use crate::model::{Connection, Layer};
use crate::registry::LayerKind;

/// `input(784) -> dense1(128) -> dense2(10)`, wired through the validator.
pub fn mlp_chain() -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph
        .add_layer(Layer::new("input", LayerKind::Input, "Input Layer").with_units(784))
        .unwrap();
    graph
        .add_layer(Layer::new("dense1", LayerKind::Dense, "Hidden").with_units(128))
        .unwrap();
    graph
        .add_layer(Layer::new("dense2", LayerKind::Dense, "Logits").with_units(10))
        .unwrap();
    graph.add_connection(Connection::new("input", "dense1")).unwrap();
    graph.add_connection(Connection::new("dense1", "dense2")).unwrap();
    graph
}

/// `conv(placeholder 28x28x1) -> flatten -> output(10)`.
pub fn conv_stack() -> NetworkGraph {
    let mut graph = NetworkGraph::new();
    graph
        .add_layer(Layer::new("conv", LayerKind::Conv2d, "Conv2D").with_units(32))
        .unwrap();
    graph
        .add_layer(Layer::new("flat", LayerKind::Flatten, "Flatten"))
        .unwrap();
    graph
        .add_layer(Layer::new("out", LayerKind::Output, "Output Layer").with_units(10))
        .unwrap();
    graph.add_connection(Connection::new("conv", "flat")).unwrap();
    graph.add_connection(Connection::new("flat", "out")).unwrap();
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_wired() {
        assert_eq!(mlp_chain().connection_count(), 2);
        assert_eq!(conv_stack().connection_count(), 2);
    }
}
