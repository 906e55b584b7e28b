use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::VidlocError;

const WHITE: &str = "&Hffffff&";
const BLACK: &str = "&H000000&";

/// Map a named color to the subtitle renderer's `&HBBGGRR&` notation.
pub fn color_code(name: &str) -> Option<&'static str> {
    match name.trim().to_lowercase().as_str() {
        "white" => Some(WHITE),
        "yellow" => Some("&H00ffff&"),
        "red" => Some("&H0000ff&"),
        "blue" => Some("&Hff0000&"),
        "green" => Some("&H00ff00&"),
        "black" => Some(BLACK),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    #[default]
    Bottom,
    Top,
    Center,
}

impl SubtitlePosition {
    /// Numpad-style alignment code used by the renderer.
    pub fn alignment(&self) -> u8 {
        match self {
            Self::Bottom => 2,
            Self::Top => 8,
            Self::Center => 5,
        }
    }

    /// Unrecognized names fall back to the bottom of the frame.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for SubtitlePosition {
    type Err = VidlocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bottom" => Ok(Self::Bottom),
            "top" => Ok(Self::Top),
            "center" | "middle" => Ok(Self::Center),
            other => Err(VidlocError::Config(format!(
                "Invalid subtitle position '{}'. Valid positions: bottom, top, center",
                other
            ))),
        }
    }
}

impl fmt::Display for SubtitlePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bottom => "bottom",
            Self::Top => "top",
            Self::Center => "center",
        };
        f.write_str(name)
    }
}

/// Extra styling only applied when burning with the advanced style string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedStyle {
    pub font_name: String,
    pub outline_color: String,
    pub outline_width: u32,
    /// 0.0 is fully transparent, 1.0 fully opaque
    pub opacity: f64,
}

impl Default for AdvancedStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            outline_color: "black".to_string(),
            outline_width: 2,
            opacity: 1.0,
        }
    }
}

impl AdvancedStyle {
    /// Opacity inverted and scaled to an 8-bit alpha channel.
    pub fn alpha(&self) -> u8 {
        let opacity = self.opacity.clamp(0.0, 1.0);
        ((1.0 - opacity) * 255.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_size: u32,
    pub font_color: String,
    pub position: SubtitlePosition,
    #[serde(default)]
    pub advanced: Option<AdvancedStyle>,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_size: 24,
            font_color: "white".to_string(),
            position: SubtitlePosition::Bottom,
            advanced: None,
        }
    }
}

impl SubtitleStyle {
    pub fn primary_colour(&self) -> &'static str {
        color_code(&self.font_color).unwrap_or(WHITE)
    }

    /// Build the `force_style` value for the subtitles filter.
    pub fn force_style(&self) -> String {
        let alignment = format!("Alignment={}", self.position.alignment());

        match &self.advanced {
            None => format!(
                "FontSize={},PrimaryColour={},{}",
                self.font_size,
                self.primary_colour(),
                alignment
            ),
            Some(advanced) => format!(
                "FontName={},FontSize={},PrimaryColour={},OutlineColour={},Outline={},{},BackColour=&H{:02x}&",
                advanced.font_name,
                self.font_size,
                self.primary_colour(),
                color_code(&advanced.outline_color).unwrap_or(BLACK),
                advanced.outline_width,
                alignment,
                advanced.alpha()
            ),
        }
    }

    /// Full `-vf` argument burning `subtitle_path` with this style.
    pub fn subtitles_filter(&self, subtitle_path: &Path) -> String {
        format!(
            "subtitles={}:force_style='{}'",
            escape_filter_path(subtitle_path),
            self.force_style()
        )
    }
}

/// Escape a path for use as a filtergraph option value.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | ':' | '\'' | ',' | '[' | ']' | ';') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
