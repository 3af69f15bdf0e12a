//! Tensor shapes and the merge-rule dispatch table
//!
//! Shapes are metadata only: integer dimension lists used for validation
//! and display. A single zero dimension (`[0]`) means "unknown".

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Layer;
use crate::registry::LayerKind;

/// Placeholder receptive shape for convolutional layers with no input.
pub const DEFAULT_RECEPTIVE_SHAPE: [usize; 3] = [28, 28, 1];

/// Ordered dimension list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(pub Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// One-element zero shape.
    pub fn unknown() -> Self {
        Shape(vec![0])
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty() || (self.0.len() == 1 && self.0[0] == 0)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Unknown shapes match any rank.
    pub fn rank_compatible(&self, other: &Shape) -> bool {
        self.is_unknown() || other.is_unknown() || self.rank() == other.rank()
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}]",
            self.0
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Combines the output shapes of several predecessors into one input shape.
///
/// `inputs` arrive in connection insertion order. Returning `None` marks
/// the combination as incompatible; the engine reports it as unknown.
pub trait MergeRule: Send + Sync {
    fn combine(&self, layer: &Layer, inputs: &[Shape]) -> Option<Shape>;
}

/// Concatenate along `config.axis` (default: last axis).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatRule;

impl MergeRule for ConcatRule {
    fn combine(&self, layer: &Layer, inputs: &[Shape]) -> Option<Shape> {
        let first = inputs.first()?;
        if inputs.iter().any(Shape::is_unknown) {
            return None;
        }
        let rank = first.rank();
        let requested = layer.config.as_ref().and_then(|c| c.axis).unwrap_or(-1);
        let axis = if requested < 0 {
            rank as i64 + requested
        } else {
            requested
        };
        if axis < 0 || axis >= rank as i64 {
            return None;
        }
        let axis = axis as usize;

        let mut dims = first.0.clone();
        for shape in &inputs[1..] {
            if shape.rank() != rank {
                return None;
            }
            let off_axis_equal = shape
                .0
                .iter()
                .zip(&first.0)
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
            if !off_axis_equal {
                return None;
            }
            dims[axis] += shape.0[axis];
        }
        Some(Shape(dims))
    }
}

/// Elementwise combination; every input must have the same shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementwiseRule;

impl MergeRule for ElementwiseRule {
    fn combine(&self, _layer: &Layer, inputs: &[Shape]) -> Option<Shape> {
        let first = inputs.first()?;
        if first.is_unknown() || inputs.iter().any(|s| s != first) {
            return None;
        }
        Some(first.clone())
    }
}

/// Inference parameters plus the merge dispatch table, keyed by layer kind.
/// Kinds without an entry resolve multiple inputs by their first
/// incoming connection.
pub struct ShapeRules {
    merge: HashMap<LayerKind, Box<dyn MergeRule>>,
    receptive_default: Shape,
}

impl fmt::Debug for ShapeRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.merge.keys().collect();
        kinds.sort();
        f.debug_struct("ShapeRules")
            .field("merge_kinds", &kinds)
            .field("receptive_default", &self.receptive_default)
            .finish()
    }
}

impl ShapeRules {
    /// Table with no merge rules at all.
    pub fn empty(receptive_default: Shape) -> Self {
        ShapeRules {
            merge: HashMap::new(),
            receptive_default,
        }
    }

    /// Default table with a custom convolutional placeholder shape.
    pub fn with_receptive_default(receptive_default: Shape) -> Self {
        let mut rules = ShapeRules::empty(receptive_default);
        rules.register(LayerKind::Concat, ConcatRule);
        rules.register(LayerKind::Add, ElementwiseRule);
        rules
    }

    /// Install or replace the merge rule for a kind.
    pub fn register(&mut self, kind: LayerKind, rule: impl MergeRule + 'static) {
        self.merge.insert(kind, Box::new(rule));
    }

    pub fn unregister(&mut self, kind: LayerKind) -> bool {
        self.merge.remove(&kind).is_some()
    }

    pub fn merge_rule(&self, kind: LayerKind) -> Option<&dyn MergeRule> {
        self.merge.get(&kind).map(|rule| &**rule)
    }

    pub fn receptive_default(&self) -> &Shape {
        &self.receptive_default
    }
}

impl Default for ShapeRules {
    fn default() -> Self {
        Self::with_receptive_default(Shape::new(DEFAULT_RECEPTIVE_SHAPE.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LayerConfig;

    fn concat_layer(axis: Option<i64>) -> Layer {
        Layer::new("cat", LayerKind::Concat, "Concatenate").with_config(LayerConfig {
            axis,
            ..Default::default()
        })
    }

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![28, 28, 1]);
        assert_eq!(s.rank(), 3);
        assert_eq!(s.numel(), 784);
        assert_eq!(s.to_string(), "[28, 28, 1]");
        assert!(Shape::unknown().is_unknown());
        assert!(!Shape::new(vec![0, 3]).is_unknown());
    }

    #[test]
    fn test_unknown_is_rank_wildcard() {
        let known = Shape::new(vec![28, 28, 1]);
        assert!(known.rank_compatible(&Shape::unknown()));
        assert!(Shape::unknown().rank_compatible(&known));
        assert!(!known.rank_compatible(&Shape::new(vec![784])));
    }

    #[test]
    fn test_concat_last_axis() {
        let layer = concat_layer(None);
        let out = ConcatRule.combine(&layer, &[Shape::new(vec![4, 8]), Shape::new(vec![4, 2])]);
        assert_eq!(out, Some(Shape::new(vec![4, 10])));
    }

    #[test]
    fn test_concat_explicit_axis() {
        let layer = concat_layer(Some(0));
        let out = ConcatRule.combine(&layer, &[Shape::new(vec![4, 8]), Shape::new(vec![3, 8])]);
        assert_eq!(out, Some(Shape::new(vec![7, 8])));
    }

    #[test]
    fn test_concat_rejects_mismatch() {
        let layer = concat_layer(None);
        assert!(ConcatRule.combine(&layer, &[Shape::new(vec![4, 8]), Shape::new(vec![5, 2])]).is_none());
        assert!(ConcatRule.combine(&layer, &[Shape::new(vec![4, 8]), Shape::new(vec![8])]).is_none());
        assert!(ConcatRule.combine(&concat_layer(Some(5)), &[Shape::new(vec![4])]).is_none());
    }

    #[test]
    fn test_elementwise_requires_equal_shapes() {
        let layer = Layer::new("add", LayerKind::Add, "Add");
        let same = [Shape::new(vec![16]), Shape::new(vec![16])];
        assert_eq!(ElementwiseRule.combine(&layer, &same), Some(Shape::new(vec![16])));
        let differ = [Shape::new(vec![16]), Shape::new(vec![8])];
        assert!(ElementwiseRule.combine(&layer, &differ).is_none());
    }

    #[test]
    fn test_default_table() {
        let rules = ShapeRules::default();
        assert!(rules.merge_rule(LayerKind::Concat).is_some());
        assert!(rules.merge_rule(LayerKind::Add).is_some());
        assert!(rules.merge_rule(LayerKind::Dense).is_none());
        assert_eq!(rules.receptive_default(), &Shape::new(vec![28, 28, 1]));
    }
}
