//! Designer configuration (`netdesign.toml`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shape::{Shape, ShapeRules, DEFAULT_RECEPTIVE_SHAPE};
use crate::validate::CyclePolicy;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE: &str = "netdesign.toml";

pub const ENV_HOST: &str = "NETDESIGN_HOST";
pub const ENV_PORT: &str = "NETDESIGN_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    pub validation: ValidationConfig,
    pub shapes: ShapeConfig,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub cycle_policy: CyclePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    /// Input shape assumed for unconnected convolutional-family layers.
    pub receptive_default: Vec<usize>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        ShapeConfig {
            receptive_default: DEFAULT_RECEPTIVE_SHAPE.to_vec(),
        }
    }
}

impl ShapeConfig {
    pub fn rules(&self) -> ShapeRules {
        ShapeRules::with_receptive_default(Shape::new(self.receptive_default.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

impl DesignerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else `netdesign.toml` under `root` if present,
    /// else defaults.
    pub fn discover(path: Option<&Path>, root: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let candidate = root.join(CONFIG_FILE);
                if candidate.exists() {
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply `NETDESIGN_HOST` / `NETDESIGN_PORT` overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var(ENV_HOST).ok(),
            std::env::var(ENV_PORT).ok(),
        )
    }

    fn apply_overrides(&mut self, host: Option<String>, port: Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port.parse().map_err(|_| ConfigError::Env {
                var: ENV_PORT,
                value: port.clone(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = DesignerConfig::from_toml_str("").unwrap();
        assert_eq!(config, DesignerConfig::default());
        assert_eq!(config.validation.cycle_policy, CyclePolicy::Local);
        assert_eq!(config.server.port, 7890);
    }

    #[test]
    fn test_partial_config() {
        let config = DesignerConfig::from_toml_str(
            r#"
[validation]
cycle_policy = "full"

[shapes]
receptive_default = [32, 32, 3]
"#,
        )
        .unwrap();
        assert_eq!(config.validation.cycle_policy, CyclePolicy::Full);
        assert_eq!(config.shapes.rules().receptive_default(), &Shape::new(vec![32, 32, 3]));
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_policy_is_error() {
        let err = DesignerConfig::from_toml_str("[validation]\ncycle_policy = \"sometimes\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let mut config = DesignerConfig::default();
        config
            .apply_overrides(Some("0.0.0.0".to_string()), Some("9000".to_string()))
            .unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);

        let err = config.apply_overrides(None, Some("port".to_string()));
        assert!(matches!(err, Err(ConfigError::Env { .. })));
    }

    #[test]
    fn test_discover_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DesignerConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config, DesignerConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "[server]\nport = 1234\n").unwrap();
        let config = DesignerConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.server.port, 1234);
    }
}
