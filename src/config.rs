//! Project settings loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::milling::{MillingParams, Stock};
use crate::operations::intersection::IntersectionParams;
use crate::operations::stages::{StageFourParams, StageOneParams, StageThreeParams, StageTwoParams};

/// Everything a milling project needs besides the scene.
///
/// Missing tables and keys fall back to their defaults, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub stock: Stock,
    pub milling: MillingParams,
    pub intersection: IntersectionParams,
    pub stage_one: StageOneParams,
    pub stage_two: StageTwoParams,
    pub stage_three: StageThreeParams,
    pub stage_four: StageFourParams,
}

impl ProjectConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for malformed input and
    /// [`ConfigError::Invalid`] for values that cannot work.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error or any error of [`ProjectConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading project configuration");
        Self::from_toml_str(&text)
    }

    /// Serializes to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if a value has no TOML form.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.validate()?;
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Checks values that would make the algorithms misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |what: &str| Err(ConfigError::Invalid(what.to_owned()));
        let s = &self.stock;
        if s.size_x <= 0.0 || s.size_y <= 0.0 || s.height <= 0.0 {
            return invalid("stock size and height must be positive");
        }
        if s.base_height < 0.0 || s.base_height >= s.height {
            return invalid("stock base must lie between 0 and the stock height");
        }
        if self.milling.resolution.0 == 0 || self.milling.resolution.1 == 0 {
            return invalid("milling resolution must be positive");
        }
        if self.intersection.step <= 0.0 || self.intersection.grid_samples == 0 {
            return invalid("intersection step and grid samples must be positive");
        }
        let radii = [
            self.stage_one.cutter_radius,
            self.stage_two.cutter_radius,
            self.stage_three.cutter_radius,
        ];
        if radii.iter().any(|&r| r <= 0.0) {
            return invalid("cutter radii must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::stages::CutDirection;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ProjectConfig::from_toml_str("").unwrap();
        assert_eq!(config.stock, Stock::default());
        assert_eq!(config.milling.resolution, (300, 300));
        assert!((config.stage_two.intersection.step - 0.2).abs() < 1e-12);
    }

    #[test]
    fn partial_tables_override() {
        let text = r#"
[stock]
size_x = 180.0
base_height = 12.0

[milling]
resolution = [400, 200]

[stage_three]
cutter_radius = 4.0

[[stage_three.parts]]
name = "body"
lines = 40
direction = "ConstantV"

[[stage_three.parts.neighbors]]
name = "handle"
hint = [10.0, 0.0, 30.0]
"#;
        let config = ProjectConfig::from_toml_str(text).unwrap();
        assert!((config.stock.size_x - 180.0).abs() < 1e-12);
        assert!((config.stock.size_y - 150.0).abs() < 1e-12);
        assert_eq!(config.milling.resolution, (400, 200));
        let part = &config.stage_three.parts[0];
        assert_eq!(part.direction, CutDirection::ConstantV);
        assert_eq!(part.neighbors[0].hint, Some([10.0, 0.0, 30.0]));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ProjectConfig::from_toml_str("[stock]\nbase_height = 80.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ProjectConfig::from_toml_str("[stock\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = ProjectConfig::default();
        config.stock.height = 42.0;
        let text = config.to_toml_string().unwrap();
        let back = ProjectConfig::from_toml_str(&text).unwrap();
        assert!((back.stock.height - 42.0).abs() < 1e-12);
    }
}
