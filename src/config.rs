//! Editor configuration.
//!
//! All settings are carried in an explicit [`EditorConfig`] value handed to
//! the session and canvas constructors. Configurations can be exported to
//! and imported from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color_utils::Color;
use crate::constants::{self, colors, zoom};
use crate::model::ShapeKind;

/// Log level setting for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Install an `env_logger` backend filtered at `level`.
///
/// `RUST_LOG` still overrides per module. Returns false if a logger was
/// already installed.
pub fn init_logging(level: LogLevel) -> bool {
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .try_init()
        .is_ok()
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Complete editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Canvas behaviour and colors
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// Labeling workflow
    #[serde(default)]
    pub session: SessionConfig,

    /// Zoom and scroll behaviour
    #[serde(default)]
    pub zoom: ZoomConfig,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings consumed by the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Vertex and edge hit radius, in device pixels
    pub vertex_epsilon: f32,
    /// Vertex marker size, in device pixels
    pub point_size: f32,
    /// Constrain new rectangles to squares
    pub draw_square: bool,
    /// Kind of shape created in Creating mode
    pub create_kind: ShapeKind,
    /// Only render the selected shape while drawing
    pub hide_background: bool,
    /// Render label text next to shapes
    pub paint_labels: bool,
    pub line_color: Color,
    pub fill_color: Color,
    pub select_line_color: Color,
    pub select_fill_color: Color,
    pub vertex_fill_color: Color,
    pub highlight_vertex_fill_color: Color,
    pub drawing_line_color: Color,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            vertex_epsilon: constants::VERTEX_EPSILON,
            point_size: constants::POINT_SIZE,
            draw_square: false,
            create_kind: ShapeKind::Rectangle,
            hide_background: false,
            paint_labels: false,
            line_color: colors::LINE,
            fill_color: colors::FILL,
            select_line_color: colors::SELECT_LINE,
            select_fill_color: colors::SELECT_FILL,
            vertex_fill_color: colors::VERTEX_FILL,
            highlight_vertex_fill_color: colors::HIGHLIGHT_VERTEX_FILL,
            drawing_line_color: colors::DRAWING_LINE,
        }
    }
}

/// Settings consumed by the edit session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Return to editing after each labeled shape
    pub beginner_mode: bool,
    /// Label every new shape with the first label used, without prompting
    pub single_class: bool,
    /// Label new shapes with `default_label` without prompting
    pub use_default_label: bool,
    pub default_label: Option<String>,
    /// Save the document automatically after each change
    pub auto_save: bool,
    /// Number of undo steps kept
    pub undo_history_size: usize,
    /// Labels offered before any shape is labeled
    pub predefined_labels: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            beginner_mode: true,
            single_class: false,
            use_default_label: false,
            default_label: None,
            auto_save: false,
            undo_history_size: constants::UNDO_HISTORY_SIZE,
            predefined_labels: Vec::new(),
        }
    }
}

/// Settings consumed by the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    pub min_percent: f32,
    pub max_percent: f32,
    /// Percent added per wheel notch
    pub wheel_increment: f32,
    /// Edge margin for zoom-at-cursor, as a fraction of the viewport
    pub cursor_margin: f32,
    /// Pixels kept free when fitting the image
    pub fit_epsilon: f32,
    /// Scroll distance per wheel notch, in pixels
    pub scroll_single_step: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min_percent: zoom::MIN_PERCENT,
            max_percent: zoom::MAX_PERCENT,
            wheel_increment: zoom::WHEEL_INCREMENT,
            cursor_margin: zoom::CURSOR_MARGIN,
            fit_epsilon: zoom::FIT_EPSILON,
            scroll_single_step: zoom::SCROLL_SINGLE_STEP,
        }
    }
}

impl EditorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            canvas: CanvasConfig::default(),
            session: SessionConfig::default(),
            zoom: ZoomConfig::default(),
            log_level: LogLevel::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips_through_json() {
        let mut config = EditorConfig::new();
        config.canvas.draw_square = true;
        config.session.predefined_labels = vec!["dog".to_string(), "cat".to_string()];
        config.log_level = LogLevel::Debug;

        let json = config.to_json().unwrap();
        let parsed = EditorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let parsed = EditorConfig::from_json(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(parsed.canvas, CanvasConfig::default());
        assert_eq!(parsed.zoom, ZoomConfig::default());
        assert!(parsed.session.beginner_mode);
    }

    #[test]
    fn test_partial_section() {
        let parsed =
            EditorConfig::from_json(r#"{ "version": 1, "canvas": { "vertex_epsilon": 5.0 } }"#)
                .unwrap();
        assert_eq!(parsed.canvas.vertex_epsilon, 5.0);
        assert_eq!(parsed.canvas.point_size, constants::POINT_SIZE);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{ "version": {} }}"#, CONFIG_VERSION + 1);
        match EditorConfig::from_json(&json) {
            Err(ConfigError::VersionTooNew { file_version, .. }) => {
                assert_eq!(file_version, CONFIG_VERSION + 1)
            }
            other => panic!("Expected VersionTooNew, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EditorConfig::from_json("not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::all().len(), 5);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("labelcanvas_config_{}", std::process::id()));
        let path = dir.join("editor.json");
        let config = EditorConfig::new();
        config.save(&path).unwrap();
        assert_eq!(EditorConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
