//! Layer kinds and their per-kind metadata

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Activation;

/// Closed set of layer kinds a design may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    // ── Endpoints ───────────────────────────────────────────
    Input,
    Output,

    // ── Parametric ──────────────────────────────────────────
    Dense,
    Conv2d,
    Lstm,
    Gru,
    Attention,

    // ── Structural ──────────────────────────────────────────
    MaxPool2d,
    AvgPool2d,
    Dropout,
    BatchNorm,
    Flatten,

    // ── Merge / split ───────────────────────────────────────
    Concat,
    Add,
    Split,
}

/// Where a kind may sit in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepts no incoming connection.
    Source,
    /// Emits no outgoing connection.
    Sink,
    Passthrough,
}

/// How a kind turns its input shape into its output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputRule {
    /// `[units]`, or unknown when units is absent.
    Units,
    /// Product of all input dimensions.
    Flatten,
    /// Input shape unchanged.
    Passthrough,
}

/// Static metadata for one layer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindInfo {
    pub kind: LayerKind,
    /// Default display name for a freshly created layer.
    pub label: &'static str,
    pub role: Role,
    pub accepts_units: bool,
    pub default_units: Option<u32>,
    pub accepts_activation: bool,
    pub default_activation: Option<Activation>,
    /// Convolutional family: falls back to a placeholder receptive shape
    /// when nothing feeds it.
    pub receptive: bool,
    pub output_rule: OutputRule,
}

impl KindInfo {
    const fn structural(kind: LayerKind, label: &'static str, receptive: bool) -> Self {
        KindInfo {
            kind,
            label,
            role: Role::Passthrough,
            accepts_units: false,
            default_units: None,
            accepts_activation: false,
            default_activation: None,
            receptive,
            output_rule: OutputRule::Passthrough,
        }
    }

    const fn parametric(kind: LayerKind, label: &'static str, units: u32) -> Self {
        KindInfo {
            kind,
            label,
            role: Role::Passthrough,
            accepts_units: true,
            default_units: Some(units),
            accepts_activation: true,
            default_activation: None,
            receptive: false,
            output_rule: OutputRule::Units,
        }
    }
}

impl LayerKind {
    pub const ALL: [LayerKind; 15] = [
        LayerKind::Input,
        LayerKind::Output,
        LayerKind::Dense,
        LayerKind::Conv2d,
        LayerKind::Lstm,
        LayerKind::Gru,
        LayerKind::Attention,
        LayerKind::MaxPool2d,
        LayerKind::AvgPool2d,
        LayerKind::Dropout,
        LayerKind::BatchNorm,
        LayerKind::Flatten,
        LayerKind::Concat,
        LayerKind::Add,
        LayerKind::Split,
    ];

    /// Registry lookup.
    pub fn info(self) -> KindInfo {
        match self {
            LayerKind::Input => KindInfo {
                role: Role::Source,
                accepts_activation: false,
                ..KindInfo::parametric(self, "Input Layer", 784)
            },
            LayerKind::Output => KindInfo {
                role: Role::Sink,
                ..KindInfo::parametric(self, "Output Layer", 10)
            },
            LayerKind::Dense => KindInfo {
                default_activation: Some(Activation::Relu),
                ..KindInfo::parametric(self, "Dense Layer", 128)
            },
            // Filters count, but spatial shape passes through.
            LayerKind::Conv2d => KindInfo {
                receptive: true,
                output_rule: OutputRule::Passthrough,
                ..KindInfo::parametric(self, "Conv2D", 64)
            },
            LayerKind::Lstm => KindInfo::parametric(self, "LSTM", 50),
            LayerKind::Gru => KindInfo::parametric(self, "GRU", 50),
            LayerKind::Attention => KindInfo::parametric(self, "Attention", 32),
            LayerKind::MaxPool2d => KindInfo::structural(self, "Max Pool 2D", true),
            LayerKind::AvgPool2d => KindInfo::structural(self, "Avg Pool 2D", true),
            LayerKind::Dropout => KindInfo::structural(self, "Dropout", false),
            LayerKind::BatchNorm => KindInfo::structural(self, "Batch Norm", false),
            LayerKind::Flatten => KindInfo {
                output_rule: OutputRule::Flatten,
                ..KindInfo::structural(self, "Flatten", false)
            },
            LayerKind::Concat => KindInfo::structural(self, "Concatenate", false),
            LayerKind::Add => KindInfo::structural(self, "Add", false),
            LayerKind::Split => KindInfo::structural(self, "Split", false),
        }
    }

    pub fn role(self) -> Role {
        self.info().role
    }

    pub fn is_source(self) -> bool {
        self.role() == Role::Source
    }

    pub fn is_sink(self) -> bool {
        self.role() == Role::Sink
    }

    /// Wire name, as used in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::Output => "output",
            LayerKind::Dense => "dense",
            LayerKind::Conv2d => "conv2d",
            LayerKind::Lstm => "lstm",
            LayerKind::Gru => "gru",
            LayerKind::Attention => "attention",
            LayerKind::MaxPool2d => "maxpool2d",
            LayerKind::AvgPool2d => "avgpool2d",
            LayerKind::Dropout => "dropout",
            LayerKind::BatchNorm => "batchnorm",
            LayerKind::Flatten => "flatten",
            LayerKind::Concat => "concat",
            LayerKind::Add => "add",
            LayerKind::Split => "split",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown layer kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for LayerKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_roles() {
        assert!(LayerKind::Input.is_source());
        assert!(LayerKind::Output.is_sink());
        assert!(LayerKind::ALL
            .into_iter()
            .filter(|k| !matches!(k, LayerKind::Input | LayerKind::Output))
            .all(|k| k.role() == Role::Passthrough));
    }

    #[test]
    fn test_wire_names_match_serde() {
        for kind in LayerKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<LayerKind>().unwrap(), kind);
        }
        assert!("transformer".parse::<LayerKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(LayerKind::Input.info().default_units, Some(784));
        assert_eq!(LayerKind::Dense.info().default_activation, Some(Activation::Relu));
        assert!(!LayerKind::Flatten.info().accepts_units);
        assert!(!LayerKind::MaxPool2d.info().accepts_activation);
        assert!(LayerKind::Conv2d.info().receptive);
        assert_eq!(LayerKind::Conv2d.info().output_rule, OutputRule::Passthrough);
    }
}
