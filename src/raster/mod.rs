//! # PNG Export
//!
//! Paints a [`LayoutPage`] onto an RGBA canvas with a white background and
//! encodes it as PNG. Coordinates are layout points multiplied by the
//! export scale.
//!
//! Glyph outlines come from the configured TrueType fonts via rusttype. The
//! standard PDF fonts have metrics but no outlines, so a page with text
//! cannot be rasterized without `fonts.regular`.

use std::collections::HashMap;

use image::{Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use tracing::{debug, info};

use crate::error::JubboError;
use crate::font::{FontContext, FontData, FontKey};
use crate::layout::{qr_dark_modules, DrawCommand, LayoutElement, LayoutPage, TextLine};
use crate::style::Color;

/// Largest canvas side in pixels.
const MAX_SIDE: f64 = 16_384.0;

pub struct Rasterizer<'a> {
    font_context: &'a FontContext,
    scale: f64,
    fonts: HashMap<FontKey, Font<'static>>,
}

impl<'a> Rasterizer<'a> {
    /// Prepare outlines for every TrueType font in the context.
    pub fn new(font_context: &'a FontContext, scale: f64) -> Result<Self, JubboError> {
        let mut fonts = HashMap::new();
        for (key, data) in font_context.registry().iter() {
            if let FontData::Custom { data, .. } = data {
                let font = Font::try_from_vec(data.clone()).ok_or_else(|| {
                    JubboError::Font(format!("Font '{}' has no usable outlines", key.family))
                })?;
                fonts.insert(key.clone(), font);
            }
        }
        Ok(Self {
            font_context,
            scale,
            fonts,
        })
    }

    /// Paint one page.
    pub fn render(&self, page: &LayoutPage) -> Result<RgbaImage, JubboError> {
        let w = (page.width * self.scale).ceil();
        let h = (page.height * self.scale).ceil();
        if !(w >= 1.0 && h >= 1.0 && w <= MAX_SIDE && h <= MAX_SIDE) {
            return Err(JubboError::Render(format!(
                "canvas of {}x{} px is out of range; lower export.png_scale",
                w, h
            )));
        }

        let mut canvas = RgbaImage::from_pixel(w as u32, h as u32, Rgba([255, 255, 255, 255]));
        for el in &page.elements {
            self.paint(&mut canvas, el)?;
        }
        debug!(width = canvas.width(), height = canvas.height(), "rasterized page");
        Ok(canvas)
    }

    fn paint(&self, canvas: &mut RgbaImage, el: &LayoutElement) -> Result<(), JubboError> {
        let s = self.scale;
        match &el.draw {
            DrawCommand::None => {}
            DrawCommand::Rect {
                background,
                border_width,
                border_color,
            } => {
                if let Some(bg) = background {
                    fill_rect(canvas, el.x * s, el.y * s, el.width * s, el.height * s, *bg);
                }
                if *border_width > 0.0 {
                    let (x, y, w, h) = (el.x * s, el.y * s, el.width * s, el.height * s);
                    let b = border_width * s;
                    let half = b / 2.0;
                    fill_rect(canvas, x - half, y - half, w + b, b, *border_color);
                    fill_rect(canvas, x - half, y + h - half, w + b, b, *border_color);
                    fill_rect(canvas, x - half, y - half, b, h + b, *border_color);
                    fill_rect(canvas, x + w - half, y - half, b, h + b, *border_color);
                }
            }
            DrawCommand::Text { lines, color } => {
                for line in lines {
                    self.paint_line(canvas, line, *color)?;
                }
            }
            DrawCommand::Qr { modules, size } => {
                for (x, y, side) in qr_dark_modules(el, modules, *size) {
                    fill_rect(canvas, x * s, y * s, side * s, side * s, Color::BLACK);
                }
            }
        }
        for child in &el.children {
            self.paint(canvas, child)?;
        }
        Ok(())
    }

    fn paint_line(
        &self,
        canvas: &mut RgbaImage,
        line: &TextLine,
        color: Color,
    ) -> Result<(), JubboError> {
        let Some(first) = line.glyphs.first() else {
            return Ok(());
        };
        let key = self
            .font_context
            .registry()
            .resolved_key(&first.font_family, first.font_weight);
        let font = self
            .fonts
            .get(&key)
            .or_else(|| self.fonts.values().next())
            .ok_or_else(|| {
                JubboError::Render(
                    "PNG export needs a TrueType font; set fonts.regular in the config".to_string(),
                )
            })?;

        let scale = em_scale(font, first.font_size * self.scale);
        let baseline = (line.y * self.scale) as f32;
        let [r, g, b, a] = color.to_rgba8();

        for glyph in &line.glyphs {
            let x = ((line.x + glyph.x_offset) * self.scale) as f32;
            let positioned = font
                .glyph(glyph.char_value)
                .scaled(scale)
                .positioned(point(x, baseline));
            let Some(bb) = positioned.pixel_bounding_box() else {
                continue;
            };
            positioned.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px < 0 || py < 0 || px >= canvas.width() as i32 || py >= canvas.height() as i32 {
                    return;
                }
                let alpha = coverage * a as f32 / 255.0;
                blend(canvas.get_pixel_mut(px as u32, py as u32), [r, g, b], alpha);
            });
        }
        Ok(())
    }
}

/// rusttype scales by ascent minus descent; convert an em size in pixels.
fn em_scale(font: &Font<'_>, em_px: f64) -> Scale {
    let v = font.v_metrics_unscaled();
    let units = font.units_per_em() as f32;
    let height = v.ascent - v.descent;
    if units <= 0.0 || height <= 0.0 {
        return Scale::uniform(em_px as f32);
    }
    Scale::uniform(em_px as f32 * height / units)
}

fn blend(pixel: &mut Rgba<u8>, rgb: [u8; 3], alpha: f32) {
    let alpha = alpha.clamp(0.0, 1.0);
    for (dst, src) in pixel.0.iter_mut().zip(rgb) {
        *dst = (src as f32 * alpha + *dst as f32 * (1.0 - alpha)).round() as u8;
    }
    pixel.0[3] = 255;
}

/// Fill a rectangle given in pixels. Partially covered edge pixels are
/// blended by coverage so hairline rules stay visible at low scales.
fn fill_rect(canvas: &mut RgbaImage, x: f64, y: f64, w: f64, h: f64, color: Color) {
    if w <= 0.0 || h <= 0.0 || color.a <= 0.0 {
        return;
    }
    let (x0, y0) = (x.max(0.0), y.max(0.0));
    let x1 = (x + w).min(canvas.width() as f64);
    let y1 = (y + h).min(canvas.height() as f64);
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let [r, g, b, a] = color.to_rgba8();
    for py in y0.floor() as u32..y1.ceil() as u32 {
        let cov_y = (y1.min(py as f64 + 1.0) - y0.max(py as f64)).clamp(0.0, 1.0);
        for px in x0.floor() as u32..x1.ceil() as u32 {
            let cov_x = (x1.min(px as f64 + 1.0) - x0.max(px as f64)).clamp(0.0, 1.0);
            let alpha = (cov_x * cov_y) as f32 * a as f32 / 255.0;
            blend(canvas.get_pixel_mut(px, py), [r, g, b], alpha);
        }
    }
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, JubboError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ColorType::Rgba8,
    )
    .map_err(|e| JubboError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(buf)
}

/// Rasterize a page and encode it in one step.
pub fn render_png(
    page: &LayoutPage,
    font_context: &FontContext,
    scale: f64,
) -> Result<Vec<u8>, JubboError> {
    let img = Rasterizer::new(font_context, scale)?.render(page)?;
    let bytes = encode_png(&img)?;
    info!(
        width = img.width(),
        height = img.height(),
        bytes = bytes.len(),
        "encoded PNG"
    );
    Ok(bytes)
}
