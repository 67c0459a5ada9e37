//! # Bulletin Template
//!
//! Two B5 landscape sheets (257 × 182 mm), folded down the middle:
//!
//! ```text
//!            left panel            right panel
//! outer   [ ads | overflow+memo ] [ cover        ]
//! inner   [ share               ] [ memo+overflow | ads ]
//! ```
//!
//! In the normal mode the primary ad region is the outer left panel and the
//! overflow region sits under the memo box on the inner right panel. In
//! many-ads mode the two swap: the "광고" title, the primary region and the
//! QR code move to the inner right panel, and the outer left panel carries
//! the overflow region on top with the memo box below it. The memo box
//! always takes whatever height the overflow region leaves unused.

use qrcode::QrCode;
use tracing::{debug, warn};

use super::{
    distribute, Column, ColumnRegion, DrawCommand, LayoutElement, LayoutPage, MeasuredBlock,
    Region, Typesetter,
};
use crate::config::Config;
use crate::content::{AdBlock, BulletinContent, Field, VerseLine};
use crate::error::JubboError;
use crate::font::FontContext;
use crate::style::{Color, TextAlign, TextStyle};

pub const MM_TO_PT: f64 = 72.0 / 25.4;
pub const SHEET_WIDTH: f64 = 257.0 * MM_TO_PT;
pub const SHEET_HEIGHT: f64 = 182.0 * MM_TO_PT;
pub const PANEL_WIDTH: f64 = SHEET_WIDTH / 2.0;

const PADDING: f64 = 28.0;
const CONTENT_WIDTH: f64 = PANEL_WIDTH - 2.0 * PADDING;
const CONTENT_HEIGHT: f64 = SHEET_HEIGHT - 2.0 * PADDING;
const SECTION_GAP: f64 = 10.0;
const BLOCK_GAP: f64 = 8.0;
const AD_INDENT: f64 = 10.0;
const QR_SIZE: f64 = 64.0;
const MEMO_MIN_HEIGHT: f64 = 120.0;
const MEMO_LINE_SPACING: f64 = 20.0;
const LITURGY_LABEL_WIDTH: f64 = 64.0;
const LITURGY_PERSON_WIDTH: f64 = 84.0;
const LITURGY_ROW_GAP: f64 = 9.0;
const VERSE_NUMBER_WIDTH: f64 = 12.0;

/// Renderer settings that come from configuration rather than the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOptions {
    /// Heading printed on the cover.
    pub title: String,
    /// Payload for the QR code.
    pub qr_url: Option<String>,
}

impl LayoutOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.title.clone(),
            qr_url: config.qr.url.clone().filter(|u| !u.trim().is_empty()),
        }
    }
}

/// Block numbers in each region after distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    pub primary: Vec<usize>,
    pub overflow: Vec<usize>,
}

/// The print layout: outer and inner sheet.
#[derive(Debug, Clone)]
pub struct BulletinLayout {
    pub pages: Vec<LayoutPage>,
    pub placement: Placement,
    /// Ads did not fit even after splitting across both regions.
    pub warning: bool,
}

/// One cover row: label, middle text, person on the right.
struct LiturgyRow<'c> {
    label: &'static str,
    middle: Vec<(&'c str, bool)>,
    person: Option<&'c Field>,
}

pub struct BulletinTemplate<'a> {
    ts: Typesetter<'a>,
    options: LayoutOptions,
}

impl<'a> BulletinTemplate<'a> {
    pub fn new(font_context: &'a FontContext, options: LayoutOptions) -> Self {
        Self {
            ts: Typesetter::new(font_context),
            options,
        }
    }

    fn style(&self, size: f64) -> TextStyle {
        TextStyle::new(self.ts.font_context().body_family(), size)
    }

    fn heading_style(&self) -> TextStyle {
        self.style(16.0).bold().align(TextAlign::Center)
    }

    fn body_style(&self) -> TextStyle {
        self.style(10.0)
    }

    /// Lay out both sheets and distribute the ads.
    pub fn layout(&self, content: &BulletinContent) -> Result<BulletinLayout, JubboError> {
        let many = content.ads_many;
        let blocks = self.measure_ads(&content.ads);

        // Panel origins for the ads panel and the memo panel.
        let (ads_x, memo_x) = if many {
            (PANEL_WIDTH, 0.0)
        } else {
            (0.0, PANEL_WIDTH)
        };

        let (mut ads_elements, mut primary) = self.ads_panel(ads_x, content.show_qr)?;
        let mut overflow = ColumnRegion::new(
            memo_x + PADDING,
            PADDING,
            CONTENT_WIDTH,
            Some(CONTENT_HEIGHT - MEMO_MIN_HEIGHT - SECTION_GAP),
            BLOCK_GAP,
        );

        let distribution = distribute(&blocks, &mut primary, &mut overflow, many);
        let placement = Placement {
            primary: primary.block_numbers(),
            overflow: overflow.block_numbers(),
        };

        ads_elements.extend(primary.place());
        let memo_elements = self.memo_panel(memo_x, &mut overflow, many);

        let (cover, _) = self.cover_panel(PANEL_WIDTH, 0.0, content);
        let (share, _) = self.share_panel(0.0, 0.0, content);

        let (outer, inner) = if many {
            ([memo_elements, cover].concat(), [share, ads_elements].concat())
        } else {
            ([ads_elements, cover].concat(), [share, memo_elements].concat())
        };

        debug!(
            ads = blocks.len(),
            primary = ?placement.primary,
            overflow = ?placement.overflow,
            many_ads = many,
            "laid out bulletin"
        );

        Ok(BulletinLayout {
            pages: vec![sheet(outer), sheet(inner)],
            placement,
            warning: distribution.warning,
        })
    }

    /// One tall column for phones: cover, share panel, then every ad.
    pub fn layout_read_view(&self, content: &BulletinContent) -> LayoutPage {
        let (mut elements, cover_bottom) = self.cover_panel(0.0, 0.0, content);

        let divider_y = cover_bottom + PADDING / 2.0;
        elements.push(LayoutElement::fill(PADDING, divider_y, CONTENT_WIDTH, 0.75, Color::RULE));
        let (share, share_bottom) = self.share_panel(0.0, divider_y - PADDING / 2.0, content);
        elements.extend(share);

        let divider_y = share_bottom + PADDING / 2.0;
        elements.push(LayoutElement::fill(PADDING, divider_y, CONTENT_WIDTH, 0.75, Color::RULE));
        let mut col = Column::new(PADDING, divider_y + PADDING / 2.0, CONTENT_WIDTH);
        col.paragraph(&self.ts, "광고", &self.heading_style());
        col.gap(SECTION_GAP);

        let mut list = ColumnRegion::new(PADDING, col.cursor(), CONTENT_WIDTH, None, BLOCK_GAP);
        for block in self.measure_ads(&content.ads) {
            list.append(block);
        }
        let height = list.y + list.rendered_height() + PADDING;
        elements.extend(col.into_elements());
        elements.extend(list.place());

        LayoutPage {
            width: PANEL_WIDTH,
            height,
            elements,
        }
    }

    /// Lay out every ad block at the content width of a panel.
    fn measure_ads(&self, ads: &[AdBlock]) -> Vec<MeasuredBlock> {
        let heading = self.style(10.5).bold();
        let body = self.style(9.5);
        ads.iter()
            .map(|ad| {
                let mut col = Column::new(0.0, 0.0, CONTENT_WIDTH);
                col.paragraph(&self.ts, &ad.heading(), &heading);
                for line in &ad.lines {
                    let top = col.cursor();
                    let dash = self.ts.paragraph("-", 2.0, top, AD_INDENT, &body);
                    let text =
                        self.ts
                            .paragraph(line, AD_INDENT, top, CONTENT_WIDTH - AD_INDENT, &body);
                    col.push(dash);
                    col.push(text);
                }
                MeasuredBlock::new(ad.number, col.into_elements())
            })
            .collect()
    }

    /// Title, empty primary region and optional QR code.
    fn ads_panel(
        &self,
        panel_x: f64,
        show_qr: bool,
    ) -> Result<(Vec<LayoutElement>, ColumnRegion), JubboError> {
        let x = panel_x + PADDING;
        let mut col = Column::new(x, PADDING, CONTENT_WIDTH);
        col.paragraph(&self.ts, "광고", &self.heading_style());
        col.gap(SECTION_GAP);
        let region_top = col.cursor();
        let mut elements = col.into_elements();

        let mut bottom = PADDING + CONTENT_HEIGHT;
        if show_qr {
            let qr_y = bottom - QR_SIZE;
            elements.push(self.qr_element(panel_x + (PANEL_WIDTH - QR_SIZE) / 2.0, qr_y)?);
            bottom = qr_y - SECTION_GAP;
        }

        let region = ColumnRegion::new(
            x,
            region_top,
            CONTENT_WIDTH,
            Some(bottom - region_top),
            BLOCK_GAP,
        );
        Ok((elements, region))
    }

    fn qr_element(&self, x: f64, y: f64) -> Result<LayoutElement, JubboError> {
        let Some(url) = &self.options.qr_url else {
            warn!("QR code is switched on but qr.url is not configured; drawing a placeholder");
            return Ok(LayoutElement::outline(x, y, QR_SIZE, QR_SIZE, 0.75, Color::RULE));
        };
        let code = QrCode::new(url.as_bytes()).map_err(|e| JubboError::Qr(e.to_string()))?;
        let size = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        Ok(LayoutElement {
            x,
            y,
            width: QR_SIZE,
            height: QR_SIZE,
            draw: DrawCommand::Qr { modules, size },
            children: Vec::new(),
        })
    }

    /// The memo box plus the overflow region, which is moved into place.
    fn memo_panel(
        &self,
        panel_x: f64,
        overflow: &mut ColumnRegion,
        overflow_on_top: bool,
    ) -> Vec<LayoutElement> {
        let x = panel_x + PADDING;
        let used = if overflow.is_empty() {
            0.0
        } else {
            overflow.rendered_height() + SECTION_GAP
        };
        let memo_height = (CONTENT_HEIGHT - used).max(MEMO_MIN_HEIGHT);

        let (memo_y, overflow_y) = if overflow_on_top {
            (PADDING + used, PADDING)
        } else {
            (PADDING, PADDING + memo_height + SECTION_GAP)
        };
        overflow.move_to(x, overflow_y);

        let mut elements = self.memo_box(x, memo_y, memo_height);
        elements.extend(overflow.place());
        elements
    }

    fn memo_box(&self, x: f64, y: f64, height: f64) -> Vec<LayoutElement> {
        let inset = 8.0;
        let label = self.ts.paragraph(
            "메모",
            x + inset,
            y + inset,
            CONTENT_WIDTH - 2.0 * inset,
            &self.style(10.0).bold(),
        );
        let mut elements = vec![LayoutElement::outline(
            x,
            y,
            CONTENT_WIDTH,
            height,
            0.75,
            Color::RULE,
        )];

        let mut line_y = label.y + label.height + MEMO_LINE_SPACING;
        elements.push(label);
        while line_y < y + height - inset {
            elements.push(LayoutElement::fill(
                x + inset,
                line_y,
                CONTENT_WIDTH - 2.0 * inset,
                0.4,
                Color::RULE,
            ));
            line_y += MEMO_LINE_SPACING;
        }
        elements
    }

    /// Cover panel. Returns its elements and the bottom of its content.
    fn cover_panel(
        &self,
        panel_x: f64,
        panel_y: f64,
        c: &BulletinContent,
    ) -> (Vec<LayoutElement>, f64) {
        let mut col = Column::new(panel_x + PADDING, panel_y + PADDING, CONTENT_WIDTH);
        col.paragraph(&self.ts, &c.date, &self.style(9.0).align(TextAlign::Right));
        col.gap(6.0);
        col.paragraph(
            &self.ts,
            &self.options.title,
            &self.style(20.0).bold().align(TextAlign::Center),
        );

        let verse = c.header_verse.trim();
        if !verse.is_empty() {
            col.gap(6.0);
            col.paragraph(&self.ts, verse, &self.style(9.0).align(TextAlign::Center));
        }

        col.gap(SECTION_GAP);
        col.rule(0.75, Color::RULE);
        col.gap(SECTION_GAP);
        col.paragraph(&self.ts, "예배 순서", &self.style(12.0).bold().align(TextAlign::Center));
        col.gap(SECTION_GAP);

        for row in liturgy(c) {
            self.liturgy_row(&mut col, &row);
            col.gap(LITURGY_ROW_GAP);
        }

        let bottom = col.cursor();
        (col.into_elements(), bottom)
    }

    fn liturgy_row(&self, col: &mut Column, row: &LiturgyRow) {
        let top = col.cursor();
        let body = self.style(10.5);
        let middle_x = col.x + LITURGY_LABEL_WIDTH;
        let middle_width = col.width - LITURGY_LABEL_WIDTH - LITURGY_PERSON_WIDTH;

        col.push(self.ts.paragraph(
            row.label,
            col.x,
            top,
            LITURGY_LABEL_WIDTH,
            &body.clone().bold(),
        ));

        let mut y = top;
        for &(text, placeholder) in &row.middle {
            let el = self.ts.paragraph(
                text,
                middle_x,
                y,
                middle_width,
                &body.clone().align(TextAlign::Center).placeholder(placeholder),
            );
            y += el.height;
            col.push(el);
        }

        if let Some(person) = row.person {
            col.push(self.ts.paragraph(
                &person.text,
                col.x + col.width - LITURGY_PERSON_WIDTH,
                top,
                LITURGY_PERSON_WIDTH,
                &body.clone().align(TextAlign::Right).placeholder(person.placeholder),
            ));
        }
    }

    /// Scripture and share questions. Returns elements and content bottom.
    fn share_panel(
        &self,
        panel_x: f64,
        panel_y: f64,
        c: &BulletinContent,
    ) -> (Vec<LayoutElement>, f64) {
        let mut col = Column::new(panel_x + PADDING, panel_y + PADDING, CONTENT_WIDTH);
        let body = self.body_style();

        col.paragraph(&self.ts, &c.share_title, &self.heading_style());
        col.gap(SECTION_GAP);

        for verse in &c.verses {
            match verse {
                VerseLine::Spacer => col.gap(body.line_box()),
                VerseLine::Plain(text) => {
                    col.paragraph(&self.ts, text, &body);
                }
                VerseLine::Numbered { number, text } => {
                    let top = col.cursor();
                    let num = self
                        .ts
                        .paragraph(number, col.x, top, VERSE_NUMBER_WIDTH, &self.style(6.5));
                    let line = self.ts.paragraph(
                        text,
                        col.x + VERSE_NUMBER_WIDTH,
                        top,
                        col.width - VERSE_NUMBER_WIDTH,
                        &body,
                    );
                    col.push(num);
                    col.push(line);
                }
            }
        }
        if let Some(r) = &c.sermon_ref {
            col.paragraph(&self.ts, r, &body.clone().align(TextAlign::Right));
        }

        col.gap(SECTION_GAP);
        col.rule(0.75, Color::RULE);
        col.gap(SECTION_GAP);
        col.paragraph(&self.ts, "나눔", &self.style(12.0).bold());
        col.gap(6.0);
        for share in c.printed_shares() {
            col.paragraph(&self.ts, share, &body);
            col.gap(8.0);
        }

        let bottom = col.cursor();
        (col.into_elements(), bottom)
    }
}

fn liturgy(c: &BulletinContent) -> Vec<LiturgyRow<'_>> {
    let mut sermon = vec![(c.sermon_title.text.as_str(), c.sermon_title.placeholder)];
    if let Some(r) = &c.sermon_ref {
        sermon.push((r.as_str(), false));
    }
    let response: Vec<(&str, bool)> = c
        .response_praise
        .iter()
        .map(|l| (l.as_str(), false))
        .collect();

    vec![
        LiturgyRow {
            label: "찬양",
            middle: vec![(c.praise.text.as_str(), c.praise.placeholder)],
            person: None,
        },
        LiturgyRow {
            label: "대표기도",
            middle: Vec::new(),
            person: Some(&c.prayer_leader),
        },
        LiturgyRow {
            label: "말씀선포",
            middle: sermon,
            person: Some(&c.preacher),
        },
        LiturgyRow {
            label: "응답찬양",
            middle: response,
            person: None,
        },
        LiturgyRow {
            label: "봉헌",
            middle: Vec::new(),
            person: Some(&c.offering_leader),
        },
        LiturgyRow {
            label: "광고",
            middle: Vec::new(),
            person: Some(&c.ad_leader),
        },
        LiturgyRow {
            label: "축도",
            middle: Vec::new(),
            person: Some(&c.benediction),
        },
    ]
}

fn sheet(elements: Vec<LayoutElement>) -> LayoutPage {
    LayoutPage {
        width: SHEET_WIDTH,
        height: SHEET_HEIGHT,
        elements,
    }
}
