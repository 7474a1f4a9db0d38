//! Service configuration loaded from TOML files.
//!
//! Every field carries a serde default matching the built-in constants, so a
//! missing or partial config file never changes behavior silently.
//!
//! ## Loading Order
//!
//! 1. Explicit `--config` path
//! 2. `HYDRODIAG_CONFIG` environment variable (path to TOML file)
//! 3. `hydrodiag.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The config is constructed once at startup and passed explicitly into the
//! service state; there is no global config singleton, which keeps the
//! aggregator pure and the handlers independently testable.

pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{PartVocabulary, StateVocabulary, VocabularyError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("model.input_edge must be greater than zero")]
    ZeroInputEdge,
}

/// Root service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Local data directory layout
    #[serde(default)]
    pub data: DataConfig,

    /// Classifier model artifact
    #[serde(default)]
    pub model: ModelConfig,

    /// Part and state label vocabularies
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    /// Spreadsheet export tuning
    #[serde(default)]
    pub export: ExportConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            model: ModelConfig::default(),
            vocabulary: VocabularyConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080"
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Externally reachable base URL, used to derive public image URLs
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory for the report store and blob namespaces
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model artifact
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Edge length of the model's square input (pixels)
    #[serde(default = "default_input_edge")]
    pub input_edge: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_edge: default_input_edge(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Part identity labels, indexed like the model's part output head
    #[serde(default = "default_part_labels")]
    pub parts: Vec<String>,

    /// Condition labels ordered least to most severe, indexed like the
    /// model's state output head
    #[serde(default = "default_state_labels")]
    pub states: Vec<String>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            parts: default_part_labels(),
            states: default_state_labels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Display edge for embedded images (pixels)
    #[serde(default = "default_export_image_edge")]
    pub image_edge_px: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            image_edge_px: default_export_image_edge(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration following the documented search order.
    ///
    /// A file that exists but fails to parse is an error; a missing file
    /// falls through to the next candidate.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load_from_file(path);
        }

        if let Ok(env_path) = std::env::var("HYDRODIAG_CONFIG") {
            let path = PathBuf::from(env_path);
            info!("Loading config from HYDRODIAG_CONFIG={}", path.display());
            return Self::load_from_file(&path);
        }

        let local = Path::new("hydrodiag.toml");
        if local.exists() {
            info!("Loading config from ./hydrodiag.toml");
            return Self::load_from_file(local);
        }

        info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load and parse a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Validate the configuration and build the two vocabularies.
    pub fn vocabularies(&self) -> Result<(PartVocabulary, StateVocabulary), ConfigError> {
        if self.model.input_edge == 0 {
            return Err(ConfigError::ZeroInputEdge);
        }
        let parts = PartVocabulary::new(self.vocabulary.parts.clone())?;
        let states = StateVocabulary::new(self.vocabulary.states.clone())?;
        if states.len() != defaults::DEFAULT_STATE_LABELS.len() {
            warn!(
                "State vocabulary has {} labels (default is {}); ensure it matches the model's state head",
                states.len(),
                defaults::DEFAULT_STATE_LABELS.len()
            );
        }
        Ok((parts, states))
    }
}

fn default_server_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_model_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_MODEL_PATH)
}

fn default_input_edge() -> u32 {
    defaults::MODEL_INPUT_EDGE
}

fn default_part_labels() -> Vec<String> {
    defaults::DEFAULT_PART_LABELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_state_labels() -> Vec<String> {
    defaults::DEFAULT_STATE_LABELS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_export_image_edge() -> u32 {
    defaults::EXPORT_IMAGE_EDGE_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();
        let (parts, states) = config.vocabularies().unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(states.label(states.len() - 1), "ruptura");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [server]
            addr = "127.0.0.1:9999"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9999");
        assert_eq!(config.server.public_base_url, "http://localhost:8080");
        assert_eq!(config.model.input_edge, defaults::MODEL_INPUT_EDGE);
        assert_eq!(config.vocabulary.states.len(), 4);
    }

    #[test]
    fn test_custom_vocabularies_are_validated() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [vocabulary]
            parts = ["bomba"]
            states = ["ok", "ok"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.vocabularies(),
            Err(ConfigError::Vocabulary(_))
        ));
    }

    #[test]
    fn test_zero_input_edge_rejected() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [model]
            input_edge = 0
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.vocabularies(),
            Err(ConfigError::ZeroInputEdge)
        ));
    }
}
