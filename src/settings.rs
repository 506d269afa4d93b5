use std::path::{Path, PathBuf};

use crate::canvas::{CellColor, parse_hex_color, to_hex};
use crate::editor::GridMode;
use crate::log_warn;

const SETTINGS_FILE: &str = "pixelsketch_settings.cfg";

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Start in a fixed-size grid instead of the infinite canvas.
    pub bounded: bool,
    pub grid_width: u32,
    pub grid_height: u32,
    /// Largest width/height accepted by a grid resize.
    pub max_grid_size: u32,
    /// Base cell edge in screen pixels at zoom 1.
    pub cell_size: f64,
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// Output pixels per cell edge on export.
    pub export_scale: u32,
    pub export_prefix: String,
    /// Color written by "apply template".
    pub stamp_color: CellColor,
    /// Pen color at startup.
    pub default_color: CellColor,
    pub show_grid: bool,
    /// Size of the export frame when first shown.
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bounded: false,
            grid_width: 13,
            grid_height: 20,
            max_grid_size: 256,
            cell_size: 20.0,
            max_undo_steps: 50,
            export_scale: 1,
            export_prefix: "pixelart".to_string(),
            stamp_color: image::Rgba([0, 0, 0, 255]),
            default_color: image::Rgba([0, 0, 0, 255]),
            show_grid: false,
            frame_width: 13,
            frame_height: 20,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelsketch/pixelsketch_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelSketch\pixelsketch_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelSketch/pixelsketch_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixelsketch");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_default();
            return Some(PathBuf::from(appdata).join("PixelSketch").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelSketch")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Grid regime these settings start in, with the size clamped to
    /// `1..=max_grid_size`.
    pub fn grid_mode(&self) -> GridMode {
        if self.bounded {
            let max = self.max_grid_size.max(1);
            GridMode::Bounded {
                width: self.grid_width.clamp(1, max),
                height: self.grid_height.clamp(1, max),
            }
        } else {
            GridMode::Unbounded
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "grid_mode={}\n\
             grid_width={}\n\
             grid_height={}\n\
             max_grid_size={}\n\
             cell_size={}\n\
             max_undo_steps={}\n\
             export_scale={}\n\
             export_prefix={}\n\
             stamp_color={}\n\
             default_color={}\n\
             show_grid={}\n\
             frame_width={}\n\
             frame_height={}\n",
            if self.bounded { "bounded" } else { "unbounded" },
            self.grid_width,
            self.grid_height,
            self.max_grid_size,
            self.cell_size,
            self.max_undo_steps,
            self.export_scale,
            self.export_prefix,
            to_hex(self.stamp_color),
            to_hex(self.default_color),
            self.show_grid,
            self.frame_width,
            self.frame_height,
        )
    }

    /// Parse `key=value` lines. Unknown keys are skipped and bad values keep
    /// their defaults.
    pub fn from_config_str(content: &str) -> Self {
        let d = Self::default();
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "grid_mode" => {
                    s.bounded = val == "bounded";
                }
                "grid_width" => {
                    s.grid_width = positive(val).unwrap_or(d.grid_width);
                }
                "grid_height" => {
                    s.grid_height = positive(val).unwrap_or(d.grid_height);
                }
                "max_grid_size" => {
                    s.max_grid_size = positive(val).unwrap_or(d.max_grid_size);
                }
                "cell_size" => {
                    s.cell_size = val
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && *v >= 1.0)
                        .unwrap_or(d.cell_size);
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().ok().filter(|v| *v > 0).unwrap_or(d.max_undo_steps);
                }
                "export_scale" => {
                    s.export_scale = positive(val).unwrap_or(d.export_scale);
                }
                "export_prefix" => {
                    if !val.is_empty() {
                        s.export_prefix = val.to_string();
                    }
                }
                "stamp_color" => {
                    s.stamp_color = parse_hex_color(val).unwrap_or(d.stamp_color);
                }
                "default_color" => {
                    s.default_color = parse_hex_color(val).unwrap_or(d.default_color);
                }
                "show_grid" => {
                    s.show_grid = val == "true";
                }
                "frame_width" => {
                    s.frame_width = positive(val).unwrap_or(d.frame_width);
                }
                "frame_height" => {
                    s.frame_height = positive(val).unwrap_or(d.frame_height);
                }
                _ => {}
            }
        }
        s
    }

    /// Save settings to disk. Failures are logged, never fatal.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            log_warn!("Could not save settings to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_config_str(&content),
            Err(_) => Self::default(),
        }
    }
}

fn positive(val: &str) -> Option<u32> {
    val.parse::<u32>().ok().filter(|v| *v > 0)
}
