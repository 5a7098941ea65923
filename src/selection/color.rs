//! Display colors for groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CarveError;

/// An sRGB display color.
///
/// Serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as floats in `[0, 1]`, the form most renderers take.
    pub fn to_f32(self) -> [f32; 3] {
        [self.r, self.g, self.b].map(|c| c as f32 / 255.0)
    }
}

/// Color of faces that belong to no group.
pub const DEFAULT_MESH_COLOR: Color = Color::rgb(173, 216, 230);

/// Colors handed out to new groups, in order, wrapping around.
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::rgb(230, 25, 75),   // red
    Color::rgb(60, 180, 75),   // green
    Color::rgb(0, 130, 200),   // blue
    Color::rgb(255, 225, 25),  // yellow
    Color::rgb(240, 50, 230),  // magenta
    Color::rgb(70, 240, 240),  // cyan
    Color::rgb(245, 130, 48),  // orange
    Color::rgb(145, 30, 180),  // purple
];

const NAMED: [(&str, Color); 12] = [
    ("red", DEFAULT_PALETTE[0]),
    ("green", DEFAULT_PALETTE[1]),
    ("blue", DEFAULT_PALETTE[2]),
    ("yellow", DEFAULT_PALETTE[3]),
    ("magenta", DEFAULT_PALETTE[4]),
    ("cyan", DEFAULT_PALETTE[5]),
    ("orange", DEFAULT_PALETTE[6]),
    ("purple", DEFAULT_PALETTE[7]),
    ("lightblue", DEFAULT_MESH_COLOR),
    ("white", Color::rgb(255, 255, 255)),
    ("grey", Color::rgb(128, 128, 128)),
    ("black", Color::rgb(0, 0, 0)),
];

impl FromStr for Color {
    type Err = CarveError;

    /// Parse `#rrggbb`, `rrggbb`, or one of a few color names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, color)) = NAMED.iter().find(|(name, _)| name.eq_ignore_ascii_case(s)) {
            return Ok(*color);
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(CarveError::invalid_param("color", s, "expected #rrggbb or a color name"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| CarveError::invalid_param("color", s, "invalid hex digit"))
        };
        Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = CarveError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_names() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!("00FF00".parse::<Color>().unwrap(), Color::rgb(0, 255, 0));
        assert_eq!("LightBlue".parse::<Color>().unwrap(), DEFAULT_MESH_COLOR);
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn test_to_f32() {
        assert_eq!(Color::rgb(255, 0, 51).to_f32(), [1.0, 0.0, 0.2]);
    }

    #[test]
    fn test_display_roundtrip() {
        for c in DEFAULT_PALETTE {
            assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
        }
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&Color::rgb(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102ff\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(1, 2, 255));
    }
}
