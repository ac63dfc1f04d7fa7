//! Host window configuration.
//!
//! `HostConfig` can be built in code with the `with_*` methods or read from a
//! TOML document. Fields missing from the document keep their defaults.
//!
//! ```
//! use easel_core::{Color, HostConfig};
//!
//! let config = HostConfig::new("Demo", 800, 600).with_background(Color::BLACK);
//! assert_eq!(config.width, 800);
//!
//! let parsed = HostConfig::from_toml_str(r#"
//!     title = "From file"
//!     width = 640
//! "#).unwrap();
//! assert_eq!(parsed.height, HostConfig::default().height);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{HostError, Result};

/// Options for the single host window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Window title.
    pub title: String,
    /// Client area width in physical pixels.
    pub width: u32,
    /// Client area height in physical pixels.
    pub height: u32,
    /// Color the canvas is filled with when the window opens.
    pub background: Color,
    /// Whether the user may resize the window.
    pub resizable: bool,
    /// Whether to center the window on the primary monitor.
    pub centered: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "easel".to_string(),
            width: 640,
            height: 480,
            background: Color::WHITE,
            resizable: false,
            centered: true,
        }
    }
}

impl HostConfig {
    /// Create a configuration with the given title and client size.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the client area size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the initial background color.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Allow or forbid user resizing.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Center the window on screen, or leave placement to the platform.
    pub fn with_centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }

    /// Check that the configuration describes a window that can be created.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(HostError::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Parse and validate a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|e| HostError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HostConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.resizable);
        assert!(config.centered);
    }

    #[test]
    fn test_builder() {
        let config = HostConfig::new("t", 1, 2)
            .with_title("title")
            .with_size(300, 200)
            .with_background(Color::BLACK)
            .with_resizable(true)
            .with_centered(false);
        assert_eq!(config.title, "title");
        assert_eq!((config.width, config.height), (300, 200));
        assert_eq!(config.background, Color::BLACK);
        assert!(config.resizable);
        assert!(!config.centered);
    }

    #[test]
    fn test_parse_partial_document() {
        let config = HostConfig::from_toml_str(
            r#"
            title = "Farm"
            height = 300

            [background]
            r = 10
            g = 20
            b = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.title, "Farm");
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 300);
        assert_eq!(config.background, Color::rgb(10, 20, 30));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = HostConfig::from_toml_str("width = 0").unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = HostConfig::from_toml_str("width = \"wide\"").unwrap_err();
        assert!(matches!(err, HostError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title = \"loaded\"\nwidth = 320\nheight = 240").unwrap();

        let config = HostConfig::load(file.path()).unwrap();
        assert_eq!(config.title, "loaded");
        assert_eq!((config.width, config.height), (320, 240));

        let missing = HostConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(HostError::Config(_))));
    }
}
