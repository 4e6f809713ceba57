//! Scan exclusions and layout parameters.
//!
//! Loaded from a JSON file; every field falls back to its default.

use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names skipped during every scan unless the user edits the list.
const DEFAULT_EXCLUDES: &str = ".git\n__pycache__\n.idea\n";

/// Entry names that never become nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_names")]
    pub names: Vec<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_names() -> Vec<String> {
    ExcludeConfig::names_from_text(DEFAULT_EXCLUDES)
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            names: default_names(),
        }
    }
}

impl ExcludeConfig {
    /// Nothing excluded.
    pub fn none() -> Self {
        Self {
            enabled: false,
            names: Vec::new(),
        }
    }

    /// Build from whitespace separated names, the format of the exclusion editor.
    pub fn from_text(text: &str) -> Self {
        Self {
            enabled: true,
            names: Self::names_from_text(text),
        }
    }

    fn names_from_text(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    /// Match on the final path component only.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.enabled && self.names.iter().any(|n| n == name)
    }
}

/// Sizes and limits used by the layout tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between a folder's edge and its children, and between packed siblings.
    #[serde(default = "default_padding")]
    pub padding: f64,

    /// Width of one narrow character in a node label.
    #[serde(default = "default_glyph_width")]
    pub glyph_width: f64,

    #[serde(default = "default_file_height")]
    pub file_height: f64,

    /// Height of a folder before it has children to wrap.
    #[serde(default = "default_folder_height")]
    pub folder_height: f64,

    /// Folders with fewer children always use the greedy packer.
    #[serde(default = "default_greedy_limit")]
    pub greedy_limit: usize,

    /// Upper bound on ancestor levels visited by one collision cascade.
    #[serde(default = "default_max_cascade_levels")]
    pub max_cascade_levels: usize,
}

fn default_padding() -> f64 {
    50.0
}
fn default_glyph_width() -> f64 {
    24.0
}
fn default_file_height() -> f64 {
    100.0
}
fn default_folder_height() -> f64 {
    500.0
}
fn default_greedy_limit() -> usize {
    100
}
fn default_max_cascade_levels() -> usize {
    256
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            glyph_width: default_glyph_width(),
            file_height: default_file_height(),
            folder_height: default_folder_height(),
            greedy_limit: default_greedy_limit(),
            max_cascade_levels: default_max_cascade_levels(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exclude: ExcludeConfig,

    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Config {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parses configuration from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LayoutError::ConfigParse {
            line: e.line(),
            message: e.to_string(),
        })
    }

    /// Loads configuration with fallback to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.layout.padding, 50.0);
        assert_eq!(config.layout.greedy_limit, 100);
        assert!(config.exclude.is_excluded(".git"));
        assert!(config.exclude.is_excluded("__pycache__"));
        assert!(!config.exclude.is_excluded("src"));
    }

    #[test]
    fn test_config_parse_partial() {
        let config = Config::parse(r#"{ "layout": { "padding": 10 } }"#).unwrap();

        assert_eq!(config.layout.padding, 10.0);
        assert_eq!(config.layout.file_height, 100.0);
        assert_eq!(config.exclude, ExcludeConfig::default());
    }

    #[test]
    fn test_config_parse_error_reports_line() {
        let err = Config::parse("{\n  \"layout\": [\n}").unwrap_err();
        match err {
            LayoutError::ConfigParse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_disabled_excludes_nothing() {
        let mut exclude = ExcludeConfig::from_text("target  node_modules\n.git");
        assert_eq!(exclude.names, vec!["target", "node_modules", ".git"]);
        assert!(exclude.is_excluded("target"));

        exclude.enabled = false;
        assert!(!exclude.is_excluded("target"));
        assert!(!ExcludeConfig::none().is_excluded(".git"));
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default("/definitely/not/here.json");
        assert_eq!(config, Config::default());
    }
}
