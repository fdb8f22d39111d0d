// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for the databank

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extension of every re-encoded image
pub const OUTPUT_EXTENSION: &str = "jpg";

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Directory scanned for images to evaluate
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// Evaluation schema file
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Where placed images are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Where node manifests are written
    #[serde(default)]
    pub databank: DatabankConfig,
}

/// Physical placement settings for evaluated images
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
    /// Longest edge in pixels an image is shrunk to when resizing is requested
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatabankConfig {
    #[serde(default = "default_databank_root")]
    pub root: PathBuf,
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
}

// Default value functions
fn default_input_path() -> PathBuf { PathBuf::from("inputs") }
fn default_schema_path() -> PathBuf { PathBuf::from("schema.json") }
fn default_output_root() -> PathBuf { PathBuf::from("databank/images") }
fn default_max_edge() -> u32 { 1920 }
fn default_jpeg_quality() -> u8 { 90 }
fn default_databank_root() -> PathBuf { PathBuf::from("databank/manifests") }
fn default_manifest_extension() -> String { "json".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            schema_path: default_schema_path(),
            output: OutputConfig::default(),
            databank: DatabankConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            max_edge: default_max_edge(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl OutputConfig {
    /// Output settings rooted at `root` with default sizing
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

impl Default for DatabankConfig {
    fn default() -> Self {
        Self {
            root: default_databank_root(),
            manifest_extension: default_manifest_extension(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::EvalBankError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the placement code cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.output.max_edge == 0 {
            return Err(crate::EvalBankError::Config("output.max_edge must be positive".to_string()));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(crate::EvalBankError::Config(format!(
                "output.jpeg_quality must be within 1..=100, got {}",
                self.output.jpeg_quality
            )));
        }
        let ext = &self.databank.manifest_extension;
        if ext.is_empty() || ext.contains('.') || ext.eq_ignore_ascii_case(OUTPUT_EXTENSION) {
            return Err(crate::EvalBankError::Config(format!(
                "databank.manifest_extension '{}' is not usable",
                ext
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"output": {"max_edge": 640}}"#).unwrap();
        assert_eq!(config.output.max_edge, 640);
        assert_eq!(config.output.jpeg_quality, 90);
        assert_eq!(config.databank.manifest_extension, "json");
        assert_eq!(config.input_path, PathBuf::from("inputs"));
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.output.jpeg_quality = 75;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.output.jpeg_quality, 75);
    }

    #[test]
    fn test_validate_rejects_bad_quality() {
        let mut config = AppConfig::default();
        config.output.jpeg_quality = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_image_extension_for_manifests() {
        let mut config = AppConfig::default();
        config.databank.manifest_extension = "JPG".to_string();
        assert!(config.validate().is_err());
    }
}
