//! # Style
//!
//! The handful of visual properties the bulletin template uses: colors,
//! font selection, alignment and line height. There is no cascade; every
//! text run in the template carries a complete [`TextStyle`].

use serde::{Deserialize, Serialize};

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    /// Placeholder text: a field the user has not filled in yet.
    pub const PLACEHOLDER: Color = Color {
        r: 0.85,
        g: 0.1,
        b: 0.1,
        a: 1.0,
    };
    /// Rules and memo lines.
    pub const RULE: Color = Color {
        r: 0.6,
        g: 0.6,
        b: 0.6,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self::rgb(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    /// 8-bit RGBA for raster output.
    pub fn to_rgba8(self) -> [u8; 4] {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b), c(self.a)]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Everything needed to measure and draw one run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u32,
    pub color: Color,
    /// Multiple of the font size.
    pub line_height: f64,
    pub letter_spacing: f64,
    pub align: TextAlign,
}

impl TextStyle {
    pub fn new(font_family: &str, font_size: f64) -> Self {
        Self {
            font_family: font_family.to_string(),
            font_size,
            font_weight: 400,
            color: Color::BLACK,
            line_height: 1.4,
            letter_spacing: 0.0,
            align: TextAlign::Left,
        }
    }

    pub fn bold(mut self) -> Self {
        self.font_weight = 700;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn line_height(mut self, line_height: f64) -> Self {
        self.line_height = line_height;
        self
    }

    /// Red when `placeholder` is set, otherwise unchanged.
    pub fn placeholder(self, placeholder: bool) -> Self {
        if placeholder {
            self.color(Color::PLACEHOLDER)
        } else {
            self
        }
    }

    /// Height of one line box in points.
    pub fn line_box(&self) -> f64 {
        self.font_size * self.line_height
    }
}
