use std::path::PathBuf;

use image::Rgba;

use crate::canvas::{Color, WHITE};
use crate::components::history::DEFAULT_MAX_HISTORY;
use crate::components::tools::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
use crate::ops::shapes::ShapeFillMode;

/// User settings persisted as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Rows at the top of the surface reserved for the toolbar.
    pub toolbar_height: u32,
    pub max_undo_steps: usize,
    pub brush_size: u32,
    pub shape_fill: ShapeFillMode,
    /// Half-period of the text caret blink.
    pub caret_blink_ms: u64,
    pub background: Color,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            canvas_width: 900,
            canvas_height: 650,
            toolbar_height: 160,
            max_undo_steps: DEFAULT_MAX_HISTORY,
            brush_size: 5,
            shape_fill: ShapeFillMode::Outline,
            caret_blink_ms: 400,
            background: WHITE,
        }
    }
}

impl AppSettings {
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("rasterpad");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterpad_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("RasterPad");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterpad_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("RasterPad");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("rasterpad_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("rasterpad_settings.cfg")))
        }
    }

    /// Serialize a colour as "r,g,b,a"
    fn color_to_str(c: Color) -> String {
        format!("{},{},{},{}", c[0], c[1], c[2], c[3])
    }

    /// Parse a colour from "r,g,b,a"
    fn str_to_color(s: &str) -> Option<Color> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 4 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            let a = parts[3].trim().parse::<u8>().ok()?;
            Some(Rgba([r, g, b, a]))
        } else {
            None
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             toolbar_height={}\n\
             max_undo_steps={}\n\
             brush_size={}\n\
             shape_fill={}\n\
             caret_blink_ms={}\n\
             background={}\n",
            self.canvas_width,
            self.canvas_height,
            self.toolbar_height,
            self.max_undo_steps,
            self.brush_size,
            self.shape_fill.as_str(),
            self.caret_blink_ms,
            Self::color_to_str(self.background),
        )
    }

    /// Parse settings text. Unknown keys are ignored, bad values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "canvas_width" => {
                    s.canvas_width = val.parse().unwrap_or(s.canvas_width).max(1);
                }
                "canvas_height" => {
                    s.canvas_height = val.parse().unwrap_or(s.canvas_height).max(2);
                }
                "toolbar_height" => {
                    s.toolbar_height = val.parse().unwrap_or(s.toolbar_height);
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().unwrap_or(DEFAULT_MAX_HISTORY).max(1);
                }
                "brush_size" => {
                    s.brush_size = val
                        .parse()
                        .unwrap_or(s.brush_size)
                        .clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
                }
                "shape_fill" => {
                    s.shape_fill = ShapeFillMode::parse(val).unwrap_or_default();
                }
                "caret_blink_ms" => {
                    s.caret_blink_ms = val.parse().unwrap_or(s.caret_blink_ms).max(1);
                }
                "background" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.background = c;
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log_warn!("Settings: could not write {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        log_info!("Settings: loaded {}", path.display());
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_string_round_trips() {
        let s = AppSettings {
            canvas_width: 640,
            toolbar_height: 90,
            shape_fill: ShapeFillMode::Filled,
            background: Rgba([10, 20, 30, 255]),
            ..AppSettings::default()
        };
        assert_eq!(AppSettings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn corrupt_values_fall_back_to_defaults() {
        let s = AppSettings::parse(
            "brush_size=900\nmax_undo_steps=lots\nbackground=1,2\nshape_fill=wavy\n# comment\nbogus",
        );
        assert_eq!(s.brush_size, MAX_BRUSH_SIZE);
        assert_eq!(s.max_undo_steps, DEFAULT_MAX_HISTORY);
        assert_eq!(s.background, WHITE);
        assert_eq!(s.shape_fill, ShapeFillMode::Outline);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(AppSettings::parse(""), AppSettings::default());
    }
}
