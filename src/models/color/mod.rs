// Color module
// Calendar colours carried by events and derived row backgrounds

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl RgbaColor {
    pub const TRANSPARENT: RgbaColor = RgbaColor::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn from_hex_str(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if (hex.len() != 6 && hex.len() != 8) || !hex.is_ascii() {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = if hex.len() == 8 {
            u8::from_str_radix(&hex[6..8], 16).ok()?
        } else {
            255
        };

        Some(RgbaColor::new(r, g, b, a))
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Same colour with alpha set to `fraction` of fully opaque.
    pub fn with_alpha(&self, fraction: f32) -> Self {
        let alpha = (fraction.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { a: alpha, ..*self }
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        RgbaColor::rgb(0, 0, 0)
    }
}

impl TryFrom<String> for RgbaColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RgbaColor::from_hex_str(&value).ok_or_else(|| format!("invalid colour '{}'", value))
    }
}

impl From<RgbaColor> for String {
    fn from(color: RgbaColor) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_and_eight_digit_hex() {
        assert_eq!(
            RgbaColor::from_hex_str("#3B82F6"),
            Some(RgbaColor::rgb(0x3B, 0x82, 0xF6))
        );
        assert_eq!(
            RgbaColor::from_hex_str("3B82F680"),
            Some(RgbaColor::new(0x3B, 0x82, 0xF6, 0x80))
        );
        assert_eq!(RgbaColor::from_hex_str("#FFF"), None);
    }

    #[test]
    fn with_alpha_scales_to_byte() {
        let color = RgbaColor::rgb(10, 20, 30).with_alpha(0.15);
        assert_eq!(color.a, 38);
        assert_eq!((color.r, color.g, color.b), (10, 20, 30));
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&RgbaColor::rgb(255, 0, 16)).unwrap();
        assert_eq!(json, "\"#FF0010\"");
        let back: RgbaColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RgbaColor::rgb(255, 0, 16));
    }
}
