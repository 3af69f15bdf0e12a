//! Core data structures for the network design graph

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::registry::LayerKind;

/// Opaque, stable identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        LayerId(id.into())
    }

    /// Fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        LayerId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        LayerId(s.to_string())
    }
}

impl From<String> for LayerId {
    fn from(s: String) -> Self {
        LayerId(s)
    }
}

/// Activation function attached to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
    Linear,
    Elu,
    Selu,
    Softplus,
    Softsign,
    HardSigmoid,
    Exponential,
    LeakyRelu,
    Prelu,
}

impl Activation {
    pub const ALL: [Activation; 13] = [
        Activation::Relu,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Softmax,
        Activation::Linear,
        Activation::Elu,
        Activation::Selu,
        Activation::Softplus,
        Activation::Softsign,
        Activation::HardSigmoid,
        Activation::Exponential,
        Activation::LeakyRelu,
        Activation::Prelu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
            Activation::Linear => "linear",
            Activation::Elu => "elu",
            Activation::Selu => "selu",
            Activation::Softplus => "softplus",
            Activation::Softsign => "softsign",
            Activation::HardSigmoid => "hard_sigmoid",
            Activation::Exponential => "exponential",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Prelu => "prelu",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convolution padding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    Valid,
    Same,
}

/// Pooling reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Max,
    Average,
}

/// Kind-specific parameters. Every field is optional, so the same struct
/// doubles as a partial update for [`LayerConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<PoolType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_sequences: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    /// Merge axis for concatenation; negative values count from the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<i64>,
}

impl LayerConfig {
    /// Shallow merge: every field set in `patch` overwrites ours.
    pub fn merge(&mut self, patch: &LayerConfig) {
        if let Some(v) = &patch.kernel_size {
            self.kernel_size = Some(v.clone());
        }
        if let Some(v) = &patch.stride {
            self.stride = Some(v.clone());
        }
        if let Some(v) = patch.padding {
            self.padding = Some(v);
        }
        if let Some(v) = &patch.pool_size {
            self.pool_size = Some(v.clone());
        }
        if let Some(v) = patch.pool_type {
            self.pool_type = Some(v);
        }
        if let Some(v) = patch.return_sequences {
            self.return_sequences = Some(v);
        }
        if let Some(v) = patch.momentum {
            self.momentum = Some(v);
        }
        if let Some(v) = patch.epsilon {
            self.epsilon = Some(v);
        }
        if let Some(v) = patch.axis {
            self.axis = Some(v);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == LayerConfig::default()
    }
}

/// A single node in the design graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<Activation>,
    /// Display override; inference never reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<Vec<usize>>,
    /// Display override; inference never reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_shape: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<LayerConfig>,
}

impl Layer {
    /// Bare layer with the given id and no optional fields set.
    pub fn new(id: impl Into<LayerId>, kind: LayerKind, name: impl Into<String>) -> Self {
        Layer {
            id: id.into(),
            kind,
            name: name.into(),
            units: None,
            activation: None,
            input_shape: None,
            output_shape: None,
            config: None,
        }
    }

    /// Layer populated from registry defaults with a freshly generated id.
    pub fn from_kind(kind: LayerKind) -> Self {
        let info = kind.info();
        Layer {
            units: info.default_units,
            activation: info.default_activation,
            ..Layer::new(LayerId::generate(), kind, info.label)
        }
    }

    pub fn with_units(mut self, units: u32) -> Self {
        self.units = Some(units);
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = Some(activation);
        self
    }

    pub fn with_config(mut self, config: LayerConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Partial update for [`Layer`]. `None` leaves a field alone; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPatch {
    #[serde(default, rename = "type")]
    pub kind: Option<LayerKind>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub units: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub activation: Option<Option<Activation>>,
    #[serde(default, deserialize_with = "nullable")]
    pub input_shape: Option<Option<Vec<usize>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub output_shape: Option<Option<Vec<usize>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub config: Option<Option<LayerConfig>>,
}

impl LayerPatch {
    pub(crate) fn apply(self, layer: &mut Layer) {
        if let Some(kind) = self.kind {
            layer.kind = kind;
        }
        if let Some(name) = self.name {
            layer.name = name;
        }
        if let Some(units) = self.units {
            layer.units = units;
        }
        if let Some(activation) = self.activation {
            layer.activation = activation;
        }
        if let Some(shape) = self.input_shape {
            layer.input_shape = shape;
        }
        if let Some(shape) = self.output_shape {
            layer.output_shape = shape;
        }
        if let Some(config) = self.config {
            layer.config = config;
        }
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A directed edge declaring data flow between two layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub from: LayerId,
    pub to: LayerId,
}

impl Connection {
    pub fn new(from: impl Into<LayerId>, to: impl Into<LayerId>) -> Self {
        Connection {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn touches(&self, id: &LayerId) -> bool {
        &self.from == id || &self.to == id
    }
}

/// Canvas coordinate of a layer. Presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}
