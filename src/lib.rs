//! # Jubbo
//!
//! A renderer for a folded two-sheet church bulletin (주보).
//!
//! The bulletin is a fixed template: B5 landscape sheets, each split into
//! two panels, with every field at a known place. The one decision made at
//! render time is where the advertisements go. They are measured as whole
//! blocks and split between a primary and an overflow region by
//! [`layout::distribute`], so a long week of announcements spills onto the
//! memo panel instead of running off the page.
//!
//! ## Architecture
//!
//! ```text
//! FormState (JSON)              Config (TOML)
//!       ↓
//!   [content]: trimmed fields, placeholders, ad blocks
//!       ↓
//!   [layout]: two-sheet template, measured regions, distribution
//!       ↓
//!   [pdf] / [raster]: 2-page PDF, PNG of a sheet or the read view
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod font;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod raster;
pub mod schedule;
pub mod style;
pub mod text;

use tracing::info;

use config::Config;
use content::BulletinContent;
use error::JubboError;
use font::FontContext;
use layout::{BulletinLayout, BulletinTemplate, LayoutOptions, LayoutPage};
use model::FormState;
use pdf::{PdfMetadata, PdfWriter};

/// What a PNG export captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngTarget {
    /// The outer print sheet.
    #[default]
    Sheet,
    /// The single-column reading view for phones.
    ReadView,
}

/// Renders form states with one configuration and one set of fonts.
pub struct Renderer {
    config: Config,
    fonts: FontContext,
}

impl Renderer {
    /// Load the configured fonts.
    pub fn new(config: Config) -> Result<Self, JubboError> {
        let fonts = FontContext::from_config(&config.fonts)?;
        Ok(Self { config, fonts })
    }

    pub fn with_fonts(config: Config, fonts: FontContext) -> Self {
        Self { config, fonts }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    fn template(&self) -> BulletinTemplate<'_> {
        BulletinTemplate::new(&self.fonts, LayoutOptions::from_config(&self.config))
    }

    /// Lay out both sheets and distribute the ads.
    pub fn layout(&self, form: &FormState) -> Result<BulletinLayout, JubboError> {
        self.template().layout(&BulletinContent::from_form(form))
    }

    pub fn read_view(&self, form: &FormState) -> LayoutPage {
        self.template()
            .layout_read_view(&BulletinContent::from_form(form))
    }

    /// The two-page print PDF.
    pub fn render_pdf(&self, form: &FormState) -> Result<Vec<u8>, JubboError> {
        let layout = self.layout(form)?;
        let metadata = PdfMetadata {
            title: Some(pdf_file_name(form, &self.config.title)),
            author: None,
        };
        let bytes = PdfWriter::new().write(&layout.pages, &metadata, &self.fonts)?;
        info!(
            pages = layout.pages.len(),
            bytes = bytes.len(),
            warning = layout.warning,
            "rendered PDF"
        );
        Ok(bytes)
    }

    pub fn render_png(&self, form: &FormState, target: PngTarget) -> Result<Vec<u8>, JubboError> {
        let page = match target {
            PngTarget::Sheet => {
                let mut layout = self.layout(form)?;
                if layout.pages.is_empty() {
                    return Err(JubboError::Render("layout produced no pages".to_string()));
                }
                layout.pages.swap_remove(0)
            }
            PngTarget::ReadView => self.read_view(form),
        };
        raster::render_png(&page, &self.fonts, self.config.png_scale())
    }
}

/// Date prefix of export file names. The entered date, or "날짜".
fn file_prefix(form: &FormState) -> String {
    let date = form.date.trim();
    let date = if date.is_empty() { "날짜" } else { date };
    date.replace(['/', '\\'], "-")
}

/// `"{date} {title}.pdf"`.
pub fn pdf_file_name(form: &FormState, title: &str) -> String {
    format!("{} {}.pdf", file_prefix(form), title.trim())
}

/// `"{date} {title}.png"`, with `(모바일)` for the read view.
pub fn png_file_name(form: &FormState, title: &str, target: PngTarget) -> String {
    match target {
        PngTarget::Sheet => format!("{} {}.png", file_prefix(form), title.trim()),
        PngTarget::ReadView => format!("{} {}(모바일).png", file_prefix(form), title.trim()),
    }
}
