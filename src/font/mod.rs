//! # Font Management
//!
//! Resolving, measuring and loading fonts for layout and export.
//!
//! Without configuration the renderer uses the standard PDF Helvetica faces,
//! which need no embedding but can only encode WinAnsi text. A Korean
//! bulletin needs a TrueType font: configure `fonts.regular` (and optionally
//! `fonts.bold`) and it is registered under [`BULLETIN_FAMILY`], parsed with
//! ttf-parser for metrics, embedded into PDFs and rasterized for PNGs.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use tracing::debug;

use crate::config::FontConfig;
use crate::error::JubboError;

/// Family name under which configured TrueType fonts are registered.
pub const BULLETIN_FAMILY: &str = "Bulletin";
pub const STANDARD_FAMILY: &str = "Helvetica";

/// A font registry that maps font family + weight to font data.
pub struct FontRegistry {
    fonts: HashMap<FontKey, FontData>,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: String,
    pub weight: u32,
}

impl FontKey {
    /// Key with the weight snapped to regular (400) or bold (700).
    pub fn snapped(family: &str, weight: u32) -> Self {
        Self {
            family: family.to_string(),
            weight: if weight >= 600 { 700 } else { 400 },
        }
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType/OpenType font that needs to be embedded.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ttf_parser::FaceParsingError> {
        let face = ttf_parser::Face::parse(data, 0)?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        // The BMP covers Hangul syllables and everything a bulletin prints.
        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// The standard PDF fonts the renderer falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica => StandardFontMetrics::HELVETICA,
            Self::HelveticaBold => StandardFontMetrics::HELVETICA_BOLD,
        }
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();

        for (weight, font) in [
            (400, StandardFont::Helvetica),
            (700, StandardFont::HelveticaBold),
        ] {
            fonts.insert(FontKey::snapped(STANDARD_FAMILY, weight), FontData::Standard(font));
        }

        Self { fonts }
    }

    /// Look up a font. Falls back to another weight of the same family
    /// (bold requested but only regular configured, or the reverse), then
    /// to Helvetica.
    pub fn resolve(&self, family: &str, weight: u32) -> &FontData {
        let key = self.resolved_key(family, weight);
        match self.fonts.get(&key) {
            Some(font) => font,
            None => &self.fonts[&FontKey::snapped(STANDARD_FAMILY, 400)],
        }
    }

    /// The key [`resolve`](Self::resolve) actually lands on. PDF font
    /// resources are keyed by it so that fallbacks share one object.
    pub fn resolved_key(&self, family: &str, weight: u32) -> FontKey {
        let key = FontKey::snapped(family, weight);
        if self.fonts.contains_key(&key) {
            return key;
        }
        let other = if key.weight == 700 { 400 } else { 700 };
        let candidate = FontKey::snapped(family, other);
        if self.fonts.contains_key(&candidate) {
            return candidate;
        }
        FontKey::snapped(STANDARD_FAMILY, weight)
    }

    /// Register a TrueType font.
    pub fn register(&mut self, family: &str, weight: u32, data: Vec<u8>) -> Result<(), JubboError> {
        let metrics = CustomFontMetrics::from_font_data(&data).map_err(|e| {
            JubboError::Font(format!("Failed to parse TTF data for '{}': {}", family, e))
        })?;
        debug!(
            family,
            weight,
            glyphs = metrics.glyph_ids.len(),
            "registered TrueType font"
        );
        self.fonts
            .insert(FontKey::snapped(family, weight), FontData::Custom { data, metrics });
        Ok(())
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.fonts.keys().any(|k| k.family == family)
    }

    /// Iterate over all registered fonts.
    pub fn iter(&self) -> impl Iterator<Item = (&FontKey, &FontData)> {
        self.fonts.iter()
    }
}

/// Shared font context used by layout and export.
/// Provides text measurement with real glyph metrics.
pub struct FontContext {
    registry: FontRegistry,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
        }
    }

    /// Build a context with the configured TrueType fonts registered.
    pub fn from_config(config: &FontConfig) -> Result<Self, JubboError> {
        let mut ctx = Self::new();
        if let Some(ref src) = config.regular {
            let data = read_font_source(src)?;
            ctx.registry.register(BULLETIN_FAMILY, 400, data)?;
        }
        if let Some(ref src) = config.bold {
            let data = read_font_source(src)?;
            ctx.registry.register(BULLETIN_FAMILY, 700, data)?;
        }
        Ok(ctx)
    }

    /// The family the template should set text in.
    pub fn body_family(&self) -> &'static str {
        if self.registry.contains_family(BULLETIN_FAMILY) {
            BULLETIN_FAMILY
        } else {
            STANDARD_FAMILY
        }
    }

    /// Whether any TrueType font is available (needed for PNG export).
    pub fn has_outlines(&self) -> bool {
        self.registry
            .iter()
            .any(|(_, data)| matches!(data, FontData::Custom { .. }))
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, family: &str, weight: u32, font_size: f64) -> f64 {
        match self.registry.resolve(family, weight) {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Resolve a font key to its font data.
    pub fn resolve(&self, family: &str, weight: u32) -> &FontData {
        self.registry.resolve(family, weight)
    }

    /// Access the underlying font registry.
    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }

    /// Access the underlying font registry mutably.
    pub fn registry_mut(&mut self) -> &mut FontRegistry {
        &mut self.registry
    }
}

/// Resolve a configured font source to raw bytes.
///
/// Supported forms:
/// - `data:font/ttf;base64,...`: data URI
/// - a file path (absolute, relative, or starting with `~`)
/// - raw base64-encoded font data
pub fn read_font_source(src: &str) -> Result<Vec<u8>, JubboError> {
    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| JubboError::Font("Invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    let path = crate::config::expand_path(std::path::Path::new(src));
    if path.exists() || src.starts_with('/') || src.starts_with('.') || src.starts_with('~') {
        return std::fs::read(&path).map_err(|e| JubboError::io(path, e));
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, JubboError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| JubboError::Font(format!("Base64 decode error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', "Helvetica", 400, 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('b', "Helvetica", 400, 12.0);
        let bold = ctx.char_width('b', "Helvetica", 700, 12.0);
        assert!(bold > regular, "Bold b should be wider than regular b");
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let w1 = ctx.char_width('A', "Helvetica", 400, 12.0);
        let w2 = ctx.char_width('A', BULLETIN_FAMILY, 400, 12.0);
        assert!((w1 - w2).abs() < 0.001);
        assert_eq!(
            ctx.registry().resolved_key(BULLETIN_FAMILY, 400),
            FontKey::snapped("Helvetica", 400)
        );
    }

    #[test]
    fn test_font_context_weight_resolution() {
        let ctx = FontContext::new();
        let w700 = ctx.char_width('A', "Helvetica", 700, 12.0);
        let w800 = ctx.char_width('A', "Helvetica", 800, 12.0);
        assert!((w700 - w800).abs() < 0.001);
    }

    #[test]
    fn regular_text_falls_back_to_the_only_configured_weight() {
        let mut registry = FontRegistry::new();
        registry.fonts.insert(
            FontKey::snapped(BULLETIN_FAMILY, 700),
            FontData::Standard(StandardFont::HelveticaBold),
        );
        assert_eq!(
            registry.resolved_key(BULLETIN_FAMILY, 400),
            FontKey::snapped(BULLETIN_FAMILY, 700)
        );
        assert!(matches!(
            registry.resolve(BULLETIN_FAMILY, 400),
            FontData::Standard(StandardFont::HelveticaBold)
        ));
        // Unknown families still land on Helvetica.
        assert_eq!(
            registry.resolved_key("Nanum", 700),
            FontKey::snapped(STANDARD_FAMILY, 700)
        );
    }

    #[test]
    fn default_context_uses_standard_family() {
        let ctx = FontContext::new();
        assert_eq!(ctx.body_family(), STANDARD_FAMILY);
        assert!(!ctx.has_outlines());
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut registry = FontRegistry::new();
        let err = registry
            .register(BULLETIN_FAMILY, 400, vec![0, 1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, JubboError::Font(_)));
        assert!(!registry.contains_family(BULLETIN_FAMILY));
    }

    #[test]
    fn font_source_data_uri_and_base64() {
        assert_eq!(read_font_source("data:font/ttf;base64,AAEC").unwrap(), vec![0, 1, 2]);
        assert_eq!(read_font_source("AAEC").unwrap(), vec![0, 1, 2]);
        assert!(matches!(
            read_font_source("data:font/ttf;base64"),
            Err(JubboError::Font(_))
        ));
        assert!(matches!(
            read_font_source("/definitely/not/here.ttf"),
            Err(JubboError::Io { .. })
        ));
    }
}
