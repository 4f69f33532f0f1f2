//! Canvas configuration
//!
//! Loaded from a flat TOML table:
//!
//! ```toml
//! edge_anti_alias = true
//! tessellation_tolerance = 0.25
//! max_state_depth = 64
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Tunables for a [`Canvas`](crate::Canvas)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Generate anti-alias fringes; when false the fringe width is zero
    pub edge_anti_alias: bool,
    /// Curve flattening tolerance at pixel ratio 1
    pub tessellation_tolerance: f32,
    /// Point merge distance at pixel ratio 1
    pub distance_tolerance: f32,
    /// Miter limit used for fill fringes
    pub fill_miter_limit: f32,
    /// `save()` beyond this depth is ignored
    pub max_state_depth: usize,
    /// Upper clamp for the transformed stroke width
    pub max_stroke_width: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            edge_anti_alias: true,
            tessellation_tolerance: 0.25,
            distance_tolerance: 0.01,
            fill_miter_limit: 2.4,
            max_state_depth: 32,
            max_stroke_width: 200.0,
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a TOML document; missing keys take defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: CanvasConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("loaded canvas config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("tessellation_tolerance", self.tessellation_tolerance)?;
        check_positive("distance_tolerance", self.distance_tolerance)?;
        check_positive("fill_miter_limit", self.fill_miter_limit)?;
        check_positive("max_stroke_width", self.max_stroke_width)?;

        if self.max_state_depth == 0 {
            tracing::warn!("rejected canvas config: max_state_depth must be at least 1");
            return Err(ConfigError::Invalid(
                "max_state_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    tracing::warn!("rejected canvas config: {} = {}", name, value);
    Err(ConfigError::Invalid(format!(
        "{name} must be a positive number, got {value}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = CanvasConfig::from_toml_str("").unwrap();
        assert_eq!(config, CanvasConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = CanvasConfig::from_toml_str(
            r#"
            edge_anti_alias = false
            max_state_depth = 4
            "#,
        )
        .unwrap();
        assert!(!config.edge_anti_alias);
        assert_eq!(config.max_state_depth, 4);
        assert_eq!(config.tessellation_tolerance, 0.25);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = CanvasConfig::from_toml_str("tessellation_tolerance = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CanvasConfig::from_toml_str("max_state_depth = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CanvasConfig::from_toml_str("edge_anti_alias = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CanvasConfig {
            max_state_depth: 8,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(CanvasConfig::from_toml_str(&text).unwrap(), config);
    }
}
