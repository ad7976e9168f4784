//! Configuration persistence for editor defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::{AnchorStyle, HeadKind, HeadStyle, LineStyle, ThicknessStyle};

/// Color representation shared by shapes and config storage.
///
/// Stored as 8-bit straight-alpha channels, serialized as a CSS-style hex
/// string, so a color always equals what it reads back as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for ShapeColor {
    fn default() -> Self {
        Self::RED
    }
}

impl ShapeColor {
    pub const RED: ShapeColor = ShapeColor::rgb(255, 0, 0);
    pub const WHITE: ShapeColor = ShapeColor::rgb(255, 255, 255);
    pub const BLACK: ShapeColor = ShapeColor::rgb(0, 0, 0);
    pub const TRANSPARENT: ShapeColor = ShapeColor::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Convert to image crate RGBA format
    pub fn to_rgba_u8(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba_u8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Parse the color notations the host writes into scene JSON
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();
        match s.as_str() {
            "red" => return Some(Self::RED),
            "white" => return Some(Self::WHITE),
            "black" => return Some(Self::BLACK),
            "transparent" | "none" => return Some(Self::TRANSPARENT),
            _ => {}
        }

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }

        let (body, has_alpha) = if let Some(body) = s.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = s.strip_prefix("rgb(") {
            (body, false)
        } else {
            return None;
        };
        let body = body.strip_suffix(')')?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != if has_alpha { 4 } else { 3 } {
            return None;
        }
        let channel = |v: &str| v.parse::<f32>().ok().map(|c| c.clamp(0.0, 255.0).round() as u8);
        let a = if has_alpha {
            (parts[3].parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8
        } else {
            255
        };
        Some(Self {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
            a,
        })
    }
}

fn parse_hex(hex: &str) -> Option<ShapeColor> {
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let nibble = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 1)?, 16)
            .ok()
            .map(|n| n * 17)
    };
    match hex.len() {
        3 => Some(ShapeColor::rgba(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        6 => Some(ShapeColor::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(ShapeColor::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

impl Serialize for ShapeColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ShapeColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ShapeColor::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized color `{raw}`")))
    }
}

/// Editor defaults persisted between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Keyword of the PNG text chunk that carries the scene
    pub payload_key: String,
    /// Stroke color for newly created shapes
    pub stroke_color: ShapeColor,
    /// Stroke width for newly created shapes
    pub stroke_width: f32,
    pub arrow_head: HeadKind,
    pub arrow_head_style: HeadStyle,
    pub arrow_line_style: LineStyle,
    pub arrow_thickness_style: ThicknessStyle,
    pub arrow_anchor_style: AnchorStyle,
    /// Mosaic block size in local units
    pub mosaic_block_size: f32,
    /// Magnification for new magnifier views (>= 1)
    pub magnification: f32,
    pub marker_font_size: f32,
    pub marker_fill: ShapeColor,
    pub marker_text_color: ShapeColor,
    /// Extra distance added to half the stroke width when picking arrows
    pub hit_margin: f32,
    /// Lower bound for the arrow pick distance
    pub hit_min_threshold: f32,
    /// Parametric steps used when sampling curved arrows
    pub curve_samples: usize,
    /// Two presses on the bend handle within this window reset the curve
    pub double_click_ms: u64,
    /// Screen-space pick radius of control handles
    pub handle_radius: f32,
    /// Dimming color painted outside an active crop
    pub shroud_color: ShapeColor,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            payload_key: Self::PAYLOAD_KEY.to_string(),
            stroke_color: ShapeColor::RED,
            stroke_width: 4.0,
            arrow_head: HeadKind::Right,
            arrow_head_style: HeadStyle::Sharp,
            arrow_line_style: LineStyle::Solid,
            arrow_thickness_style: ThicknessStyle::Uniform,
            arrow_anchor_style: AnchorStyle::Straight,
            mosaic_block_size: 15.0,
            magnification: 2.0,
            marker_font_size: 20.0,
            marker_fill: ShapeColor::RED,
            marker_text_color: ShapeColor::WHITE,
            hit_margin: 4.0,
            hit_min_threshold: 6.0,
            curve_samples: 40,
            double_click_ms: 300,
            handle_radius: 12.0,
            shroud_color: ShapeColor::rgba(0, 0, 0, 128),
        }
    }
}

impl EditorConfig {
    /// Application directory name under the platform config dir
    pub const ID: &'static str = "reedit";
    pub const PAYLOAD_KEY: &'static str = "ImageEditorData";

    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(Self::ID).join("config.json"))
    }

    /// Load configuration from disk, or return defaults if unavailable
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(err) => {
                log::warn!("Could not read config {}: {:?}", path.display(), err);
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                log::warn!("Error loading config, using defaults: {:?}", err);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) {
        match Self::path() {
            Some(path) => self.save_to(&path),
            None => log::error!("Could not resolve config directory for saving"),
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            log::error!("Failed to create config dir {}: {:?}", parent.display(), err);
            return;
        }
        let json = match serde_json::to_string_pretty(self) {
            Ok(json) => json,
            Err(err) => {
                log::error!("Failed to serialize config: {:?}", err);
                return;
            }
        };
        if let Err(err) = std::fs::write(path, json) {
            log::error!("Failed to save config: {:?}", err);
        }
    }

    /// Clamp values a hand-edited file could get wrong
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.payload_key.is_empty() || self.payload_key.len() > 79 {
            log::warn!("Config payload key is unusable, using `{}`", defaults.payload_key);
            self.payload_key = defaults.payload_key;
        }
        if !(self.stroke_width.is_finite() && self.stroke_width >= 0.0) {
            self.stroke_width = defaults.stroke_width;
        }
        if !(self.mosaic_block_size.is_finite() && self.mosaic_block_size > 0.0) {
            self.mosaic_block_size = defaults.mosaic_block_size;
        }
        if !(self.magnification.is_finite() && self.magnification >= 1.0) {
            self.magnification = defaults.magnification;
        }
        if !(self.marker_font_size.is_finite() && self.marker_font_size > 0.0) {
            self.marker_font_size = defaults.marker_font_size;
        }
        self.curve_samples = self.curve_samples.clamp(20, 50);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_round_trip() {
        let c = ShapeColor::rgba(0x12, 0xab, 0xff, 0x80);
        assert_eq!(c.to_hex(), "#12abff80");
        assert_eq!(ShapeColor::parse("#12abff80"), Some(c));
        assert_eq!(ShapeColor::RED.to_hex(), "#ff0000");
    }

    #[test]
    fn test_color_parse_variants() {
        assert_eq!(ShapeColor::parse("#0cf").unwrap().to_hex(), "#00ccff");
        assert_eq!(ShapeColor::parse("white"), Some(ShapeColor::WHITE));
        assert!(ShapeColor::parse("transparent").unwrap().is_transparent());
        let c = ShapeColor::parse("rgba(200, 200, 200, 0.3)").unwrap();
        assert_eq!(c.to_rgba_u8(), [200, 200, 200, 77]);
        assert_eq!(ShapeColor::parse("rgb(0,0,0)"), Some(ShapeColor::BLACK));
        assert_eq!(ShapeColor::parse("rgba(0, 0, 0, 0.5)"), Some(ShapeColor::rgba(0, 0, 0, 128)));
        assert_eq!(ShapeColor::parse("#12345"), None);
        assert_eq!(ShapeColor::parse("chartreuse"), None);
    }

    #[test]
    fn test_config_partial_file_keeps_defaults() {
        let cfg: EditorConfig =
            serde_json::from_str(r##"{"mosaicBlockSize": 8, "strokeColor": "#00ff00"}"##).unwrap();
        assert_eq!(cfg.mosaic_block_size, 8.0);
        assert_eq!(cfg.stroke_color, ShapeColor::rgb(0, 255, 0));
        assert_eq!(cfg.payload_key, EditorConfig::PAYLOAD_KEY);
        assert_eq!(cfg.double_click_ms, 300);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = EditorConfig {
            magnification: 3.0,
            arrow_head: HeadKind::Both,
            stroke_color: ShapeColor::rgba(0x12, 0x34, 0x56, 0x9a),
            ..EditorConfig::default()
        };
        cfg.save_to(&path);
        let loaded = EditorConfig::load_from(&path);
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.shroud_color, ShapeColor::rgba(0, 0, 0, 128));
    }

    #[test]
    fn test_config_load_falls_back_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(EditorConfig::load_from(&path), EditorConfig::default());
        assert_eq!(
            EditorConfig::load_from(&dir.path().join("missing.json")),
            EditorConfig::default()
        );
    }

    #[test]
    fn test_config_sanitizes_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"magnification": 0.5, "payloadKey": "", "curveSamples": 500}"#)
            .unwrap();
        let cfg = EditorConfig::load_from(&path);
        assert_eq!(cfg.magnification, 2.0);
        assert_eq!(cfg.payload_key, EditorConfig::PAYLOAD_KEY);
        assert_eq!(cfg.curve_samples, 50);
    }
}
