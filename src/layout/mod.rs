//! # Layout
//!
//! The bulletin is a fixed template, not a flowing document: two B5
//! landscape sheets, each split into two panels, with every piece of text at
//! a known place. The only content whose placement is decided at render
//! time is the advertisement list, and that decision belongs to
//! [`distribute`].
//!
//! Layout produces the same output shape for every backend: positioned
//! [`LayoutElement`]s carrying a [`DrawCommand`]. Text is broken into lines
//! with real font metrics, so the heights the distributor compares are the
//! heights that get printed.

pub mod distribute;
pub mod template;

pub use distribute::{distribute, Distribution, Region, FIT_TOLERANCE};
pub use template::{BulletinLayout, BulletinTemplate, LayoutOptions, Placement};

use crate::font::{FontContext, FontData};
use crate::style::{Color, TextAlign, TextStyle};
use crate::text::TextLayout;

/// A fully laid-out page ready for PDF or PNG output.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Absolute position on the page (top-left corner).
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// The visual properties to draw.
    pub draw: DrawCommand,
    /// Child elements (positioned relative to page, not parent).
    pub children: Vec<LayoutElement>,
}

/// What to actually draw for this element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Nothing to draw (just a layout container).
    None,
    /// A filled and/or outlined rectangle. Rules are thin filled rects.
    Rect {
        background: Option<Color>,
        border_width: f64,
        border_color: Color,
    },
    /// Draw text.
    Text { lines: Vec<TextLine>, color: Color },
    /// A QR symbol: `size`×`size` modules, row-major, `true` is dark.
    Qr { modules: Vec<bool>, size: usize },
}

#[derive(Debug, Clone)]
pub struct TextLine {
    pub x: f64,
    /// Baseline.
    pub y: f64,
    pub glyphs: Vec<PositionedGlyph>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone)]
pub struct PositionedGlyph {
    pub glyph_id: u16,
    pub x_offset: f64,
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: u32,
    pub char_value: char,
    /// Letter spacing applied after this glyph.
    pub letter_spacing: f64,
}

impl LayoutElement {
    pub fn container(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        children: Vec<LayoutElement>,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            draw: DrawCommand::None,
            children,
        }
    }

    pub fn fill(x: f64, y: f64, width: f64, height: f64, color: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            draw: DrawCommand::Rect {
                background: Some(color),
                border_width: 0.0,
                border_color: Color::BLACK,
            },
            children: Vec::new(),
        }
    }

    pub fn outline(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        border_width: f64,
        color: Color,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            draw: DrawCommand::Rect {
                background: None,
                border_width,
                border_color: color,
            },
            children: Vec::new(),
        }
    }

    /// Shift this element and all its nested content.
    pub fn offset(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
        if let DrawCommand::Text { ref mut lines, .. } = self.draw {
            for line in lines.iter_mut() {
                line.x += dx;
                line.y += dy;
            }
        }
        for child in &mut self.children {
            child.offset(dx, dy);
        }
    }

    /// This element's text, lines joined with `\n`. Nested text included.
    pub fn text(&self) -> String {
        let mut out = Vec::new();
        self.collect_text(&mut out);
        out.join("\n")
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        if let DrawCommand::Text { lines, .. } = &self.draw {
            for line in lines {
                out.push(line.glyphs.iter().map(|g| g.char_value).collect());
            }
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// White border around a QR symbol, in modules.
pub const QR_QUIET_ZONE: usize = 2;

/// Squares `(x, y, side)` covering the dark modules of a QR element drawn
/// into its box, quiet zone included.
pub fn qr_dark_modules(el: &LayoutElement, modules: &[bool], size: usize) -> Vec<(f64, f64, f64)> {
    if size == 0 {
        return Vec::new();
    }
    let side = el.width.min(el.height) / (size + 2 * QR_QUIET_ZONE) as f64;
    modules
        .iter()
        .enumerate()
        .filter(|(_, &dark)| dark)
        .map(|(i, _)| {
            let (row, col) = (i / size, i % size);
            (
                el.x + (col + QR_QUIET_ZONE) as f64 * side,
                el.y + (row + QR_QUIET_ZONE) as f64 * side,
                side,
            )
        })
        .collect()
}

impl LayoutPage {
    /// All text on the page in drawing order, one line per entry.
    pub fn text_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for el in &self.elements {
            el.collect_text(&mut out);
        }
        out
    }
}

/// Breaks and positions paragraphs using the registered fonts.
pub struct Typesetter<'a> {
    font_context: &'a FontContext,
    text_layout: TextLayout,
}

impl<'a> Typesetter<'a> {
    pub fn new(font_context: &'a FontContext) -> Self {
        Self {
            font_context,
            text_layout: TextLayout::new(),
        }
    }

    pub fn font_context(&self) -> &'a FontContext {
        self.font_context
    }

    /// Lay out `text` in a box `width` wide with its top edge at `y`. The
    /// element is exactly as tall as its line boxes.
    pub fn paragraph(
        &self,
        text: &str,
        x: f64,
        y: f64,
        width: f64,
        style: &TextStyle,
    ) -> LayoutElement {
        let broken = self
            .text_layout
            .break_into_lines(self.font_context, text, width, style);
        let line_box = style.line_box();
        // Center the em box in the line box; the baseline sits 0.8 em down.
        let baseline_shift = (line_box - style.font_size) / 2.0 + style.font_size * 0.8;

        let lines = broken
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let align_offset = match style.align {
                    TextAlign::Left => 0.0,
                    TextAlign::Center => ((width - line.width) / 2.0).max(0.0),
                    TextAlign::Right => (width - line.width).max(0.0),
                };
                let glyphs = line
                    .chars
                    .iter()
                    .zip(&line.char_positions)
                    .map(|(&ch, &x_offset)| PositionedGlyph {
                        glyph_id: self.glyph_id(ch, style),
                        x_offset,
                        font_size: style.font_size,
                        font_family: style.font_family.clone(),
                        font_weight: style.font_weight,
                        char_value: ch,
                        letter_spacing: style.letter_spacing,
                    })
                    .collect();
                TextLine {
                    x: x + align_offset,
                    y: y + i as f64 * line_box + baseline_shift,
                    glyphs,
                    width: line.width,
                    height: line_box,
                }
            })
            .collect::<Vec<_>>();

        LayoutElement {
            x,
            y,
            width,
            height: lines.len() as f64 * line_box,
            draw: DrawCommand::Text {
                lines,
                color: style.color,
            },
            children: Vec::new(),
        }
    }

    fn glyph_id(&self, ch: char, style: &TextStyle) -> u16 {
        match self.font_context.resolve(&style.font_family, style.font_weight) {
            FontData::Standard(_) => u16::try_from(ch as u32).unwrap_or(0),
            FontData::Custom { metrics, .. } => metrics.glyph_ids.get(&ch).copied().unwrap_or(0),
        }
    }
}

/// Stacks elements top to bottom inside a fixed-width column.
pub struct Column {
    pub x: f64,
    pub width: f64,
    cursor: f64,
    elements: Vec<LayoutElement>,
}

impl Column {
    pub fn new(x: f64, y: f64, width: f64) -> Self {
        Self {
            x,
            width,
            cursor: y,
            elements: Vec::new(),
        }
    }

    /// Y of the next element's top edge.
    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn gap(&mut self, h: f64) {
        self.cursor += h;
    }

    /// Add an already positioned element and move below it.
    pub fn push(&mut self, el: LayoutElement) {
        self.cursor = self.cursor.max(el.y + el.height);
        self.elements.push(el);
    }

    /// Add a paragraph across the full column width. Returns its height.
    pub fn paragraph(&mut self, ts: &Typesetter, text: &str, style: &TextStyle) -> f64 {
        let el = ts.paragraph(text, self.x, self.cursor, self.width, style);
        let h = el.height;
        self.push(el);
        h
    }

    /// A horizontal rule across the column.
    pub fn rule(&mut self, thickness: f64, color: Color) {
        let el = LayoutElement::fill(self.x, self.cursor, self.width, thickness, color);
        self.push(el);
    }

    pub fn into_elements(self) -> Vec<LayoutElement> {
        self.elements
    }
}

/// An ad block laid out at the origin, ready to be placed anywhere.
#[derive(Debug, Clone)]
pub struct MeasuredBlock {
    /// The block's display number.
    pub number: usize,
    pub height: f64,
    elements: Vec<LayoutElement>,
}

impl MeasuredBlock {
    pub fn new(number: usize, elements: Vec<LayoutElement>) -> Self {
        let height = elements
            .iter()
            .map(|e| e.y + e.height)
            .fold(0.0_f64, f64::max);
        Self {
            number,
            height,
            elements,
        }
    }
}

/// A region of a panel that stacks measured blocks with a fixed gap.
#[derive(Debug, Clone)]
pub struct ColumnRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    capacity: Option<f64>,
    gap: f64,
    blocks: Vec<MeasuredBlock>,
}

impl ColumnRegion {
    pub fn new(x: f64, y: f64, width: f64, capacity: Option<f64>, gap: f64) -> Self {
        Self {
            x,
            y,
            width,
            capacity,
            gap,
            blocks: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[MeasuredBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_numbers(&self) -> Vec<usize> {
        self.blocks.iter().map(|b| b.number).collect()
    }

    /// Move the region, keeping its contents.
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// The blocks positioned on the page.
    pub fn place(&self) -> Vec<LayoutElement> {
        let mut out = Vec::new();
        let mut y = self.y;
        for block in &self.blocks {
            for el in &block.elements {
                let mut el = el.clone();
                el.offset(self.x, y);
                out.push(el);
            }
            y += block.height + self.gap;
        }
        out
    }
}

impl Region<MeasuredBlock> for ColumnRegion {
    fn clear(&mut self) {
        self.blocks.clear();
    }

    fn append(&mut self, block: MeasuredBlock) {
        self.blocks.push(block);
    }

    fn remove_last(&mut self) -> Option<MeasuredBlock> {
        self.blocks.pop()
    }

    fn rendered_height(&self) -> f64 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        let content: f64 = self.blocks.iter().map(|b| b.height).sum();
        content + self.gap * (self.blocks.len() - 1) as f64
    }

    fn capacity_height(&self) -> Option<f64> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle::new("Helvetica", 10.0)
    }

    #[test]
    fn paragraph_height_is_line_count_times_line_box() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let el = ts.paragraph("one\ntwo\nthree", 10.0, 20.0, 200.0, &style());
        assert!((el.height - 3.0 * 14.0).abs() < 1e-9);
        match &el.draw {
            DrawCommand::Text { lines, .. } => {
                assert_eq!(lines.len(), 3);
                assert!(lines[1].y > lines[0].y);
                assert_eq!(lines[0].x, 10.0);
            }
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(el.text(), "one\ntwo\nthree");
    }

    #[test]
    fn alignment_moves_line_start() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let right = ts.paragraph("ab", 0.0, 0.0, 100.0, &style().align(TextAlign::Right));
        let center = ts.paragraph("ab", 0.0, 0.0, 100.0, &style().align(TextAlign::Center));
        let x = |el: &LayoutElement| match &el.draw {
            DrawCommand::Text { lines, .. } => lines[0].x,
            _ => f64::NAN,
        };
        assert!((x(&right) - (100.0 - 11.12)).abs() < 1e-9);
        assert!((x(&center) - (100.0 - 11.12) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn offset_moves_text_lines() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let text = ts.paragraph("x", 0.0, 0.0, 50.0, &style());
        let mut el = LayoutElement::container(0.0, 0.0, 10.0, 10.0, vec![text]);
        el.offset(5.0, 7.0);
        assert_eq!((el.x, el.y), (5.0, 7.0));
        match &el.children[0].draw {
            DrawCommand::Text { lines, .. } => assert_eq!(lines[0].x, 5.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn column_stacks_elements() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let mut col = Column::new(0.0, 10.0, 100.0);
        col.paragraph(&ts, "a", &style());
        col.gap(6.0);
        col.rule(1.0, Color::RULE);
        assert!((col.cursor() - (10.0 + 14.0 + 6.0 + 1.0)).abs() < 1e-9);
        assert_eq!(col.into_elements().len(), 2);
    }

    #[test]
    fn qr_modules_sit_inside_the_quiet_zone() {
        let el = LayoutElement::container(10.0, 20.0, 25.0, 25.0, Vec::new());
        // 1x1 symbol, 5 modules across with the quiet zone: 5pt each.
        let squares = qr_dark_modules(&el, &[true], 1);
        assert_eq!(squares, vec![(20.0, 30.0, 5.0)]);
        assert!(qr_dark_modules(&el, &[false], 1).is_empty());
    }

    #[test]
    fn region_height_counts_gaps_between_blocks() {
        let block = |n, h| {
            MeasuredBlock::new(n, vec![LayoutElement::fill(0.0, 0.0, 10.0, h, Color::BLACK)])
        };
        let mut region = ColumnRegion::new(20.0, 30.0, 100.0, Some(100.0), 5.0);
        assert_eq!(region.rendered_height(), 0.0);
        region.append(block(1, 10.0));
        region.append(block(2, 20.0));
        assert!((region.rendered_height() - 35.0).abs() < 1e-9);
        assert_eq!(region.block_numbers(), vec![1, 2]);

        let placed = region.place();
        assert_eq!((placed[0].x, placed[0].y), (20.0, 30.0));
        assert_eq!(placed[1].y, 30.0 + 10.0 + 5.0);

        assert_eq!(region.remove_last().map(|b| b.number), Some(2));
        region.clear();
        assert!(region.is_empty());
    }
}
