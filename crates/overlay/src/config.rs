use anchorspace_dom::{Markup, Style};
use anchorspace_scene::SceneNode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default change-detection threshold, in pixels.
pub const DEFAULT_EPS: f32 = 0.001;

/// Errors from loading an overlay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("eps must be finite and non-negative, got {0}")]
    InvalidEps(f32),
    #[error("unsupported config format: {0}")]
    UnknownFormat(PathBuf),
}

/// Presentation options of an overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Minimum per-axis movement, in pixels, that triggers a style write.
    pub eps: f32,
    /// Insert the overlay element before the surface's siblings instead of after.
    pub prepend: bool,
    /// Center the content on the anchor point instead of hanging it from
    /// its top-left corner.
    pub center: bool,
    /// Inline style of the content wrapper, applied over the defaults.
    pub style: Style,
    pub class_name: Option<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            prepend: false,
            center: false,
            style: Style::new(),
            class_name: None,
        }
    }
}

impl OverlayConfig {
    /// Load from a `.json`, `.yaml` or `.yml` file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&text)?,
            _ => return Err(ConfigError::UnknownFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), ?config, "overlay config loaded");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(ConfigError::InvalidEps(self.eps));
        }
        Ok(())
    }

    /// Threshold to track with. Invalid values fall back to `DEFAULT_EPS`.
    pub fn effective_eps(&self) -> f32 {
        match self.validate() {
            Ok(()) => self.eps,
            Err(e) => {
                tracing::warn!("{e}, using {DEFAULT_EPS}");
                DEFAULT_EPS
            }
        }
    }
}

/// Everything an overlay is mounted or updated with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayProps {
    #[serde(flatten)]
    pub config: OverlayConfig,
    /// Properties forwarded to the anchor scene node.
    pub node: SceneNode,
    /// Content rendered inside the wrapper.
    pub children: Markup,
}

impl OverlayProps {
    pub fn new(children: Markup) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: OverlayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_node(mut self, node: SceneNode) -> Self {
        self.node = node;
        self
    }
}
