//! Integration tests for the jubbo rendering pipeline.
//!
//! These tests exercise the full path from a saved form to export bytes.
//! They verify:
//! - a stored form survives a save/load round trip and still renders
//! - the PDF is structurally valid and carries both sheets
//! - form edits show up in the ad placement
//! - many-ads mode swaps which sheet hosts the ad list
//! - PNG export fails cleanly without a TrueType font

use std::time::Duration;

use jubbo::config::Config;
use jubbo::error::JubboError;
use jubbo::font::FontContext;
use jubbo::model::store::FormStore;
use jubbo::model::{AdEntry, FormState};
use jubbo::schedule::WatchLoop;
use jubbo::{pdf_file_name, PngTarget, Renderer};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

// ─── Helpers ────────────────────────────────────────────────────

fn renderer() -> Renderer {
    Renderer::with_fonts(Config::default(), FontContext::new())
}

fn form_with_ads(n: usize, lines: usize) -> FormState {
    let mut form = FormState::default();
    form.ads = (0..n)
        .map(|i| {
            let body = (0..lines)
                .map(|l| format!("detail {}", l + 1))
                .collect::<Vec<_>>()
                .join("\n");
            AdEntry::new(format!("notice {}", i + 1), body)
        })
        .collect();
    form
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

fn count(bytes: &[u8], needle: &[u8]) -> usize {
    bytes.windows(needle.len()).filter(|w| *w == needle).count()
}

// ─── Export ─────────────────────────────────────────────────────

#[test]
fn fresh_form_renders_two_sheets() {
    let bytes = renderer().render_pdf(&FormState::default()).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(count(&bytes, b"/Type /Page "), 2);
    assert_eq!(count(&bytes, b"/MediaBox [0 0 728.50 515.91]"), 2);
}

#[test]
fn pdf_title_is_the_export_file_name() {
    let mut form = FormState::default();
    form.set_date_from_picker("2026-03-01").unwrap();
    assert_eq!(form.date, "2026년 3월 1일");
    assert_eq!(pdf_file_name(&form, "주보"), "2026년 3월 1일 주보.pdf");

    let bytes = renderer().render_pdf(&form).unwrap();
    // UTF-16BE: BOM, "2026", then U+B144 (년).
    assert_eq!(count(&bytes, b"/Title <FEFF0032003000320036B144"), 1);
}

#[rstest]
#[case(PngTarget::Sheet)]
#[case(PngTarget::ReadView)]
fn png_needs_a_truetype_font(#[case] target: PngTarget) {
    let err = renderer()
        .render_png(&FormState::default(), target)
        .unwrap_err();
    assert!(matches!(err, JubboError::Render(_)), "got {:?}", err);
}

#[test]
fn default_config_renders_without_fonts() {
    let renderer = Renderer::new(Config::default()).unwrap();
    assert!(!renderer.fonts().has_outlines());
    assert_valid_pdf(&renderer.render_pdf(&FormState::default()).unwrap());
}

#[test]
fn missing_font_file_is_reported() {
    let mut config = Config::default();
    config.fonts.regular = Some("/nonexistent/NanumGothic.ttf".into());
    let err = Renderer::new(config).err().unwrap();
    assert!(matches!(err, JubboError::Io { .. }));
}

// ─── Persistence ────────────────────────────────────────────────

#[test]
fn saved_form_renders_the_same_placement() {
    let dir = TempDir::new().unwrap();
    let store = FormStore::new(dir.path().join("nested").join("form.json"));

    let mut form = form_with_ads(5, 5);
    form.sermon_title = "은혜".into();
    store.save(&form).unwrap();

    let restored = store.load().unwrap();
    assert_eq!(restored, form);

    let r = renderer();
    let before = r.layout(&form).unwrap();
    let after = r.layout(&restored).unwrap();
    assert_eq!(before.placement, after.placement);
    assert_eq!(before.warning, after.warning);
}

#[test]
fn corrupt_state_falls_back_to_a_fresh_form() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("form.json");
    std::fs::write(&path, "{\"ads\": [").unwrap();
    let store = FormStore::new(&path);

    assert!(store.load().is_none());
    let form = store.load_or_default();
    assert_eq!(form, FormState::default());
    assert_valid_pdf(&renderer().render_pdf(&form).unwrap());
}

// ─── Ad placement ───────────────────────────────────────────────

#[test]
fn fresh_form_ads_fit_the_outer_sheet() {
    let layout = renderer().layout(&FormState::default()).unwrap();
    // The empty variable ad prints nothing; the two default ads follow it.
    assert_eq!(layout.placement.primary, vec![2, 3]);
    assert!(layout.placement.overflow.is_empty());
    assert!(!layout.warning);

    let outer = layout.pages[0].text_lines();
    assert!(outer.iter().any(|l| l == "2. 새가족 안내"));
}

#[test]
fn reordering_ads_changes_the_numbering() {
    let mut form = form_with_ads(3, 1);
    form.move_ad(2, 0).unwrap();
    let layout = renderer().layout(&form).unwrap();
    let outer = layout.pages[0].text_lines();
    assert!(outer.iter().any(|l| l == "1. notice 3"));
    assert!(outer.iter().any(|l| l == "3. notice 2"));
}

#[test]
fn every_ad_lands_in_exactly_one_region() {
    for many_ads in [false, true] {
        let mut form = form_with_ads(9, 5);
        form.ads_many = many_ads;
        let layout = renderer().layout(&form).unwrap();

        let mut all = [
            layout.placement.primary.clone(),
            layout.placement.overflow.clone(),
        ]
        .concat();
        all.sort_unstable();
        assert_eq!(all, (1..=9).collect::<Vec<_>>());
        assert!(!layout.placement.primary.is_empty());
        assert!(!layout.placement.overflow.is_empty());
    }
}

#[test]
fn many_ads_mode_fills_the_inner_panel_first() {
    let mut form = form_with_ads(9, 5);
    form.ads_many = true;
    let layout = renderer().layout(&form).unwrap();

    // The primary region now lives on the inner sheet and takes the
    // leading blocks; the rest spill to the outer sheet.
    assert_eq!(layout.placement.primary[0], 1);
    let inner = layout.pages[1].text_lines();
    let outer = layout.pages[0].text_lines();
    assert!(inner.iter().any(|l| l == "1. notice 1"));
    assert!(outer.iter().any(|l| l == "9. notice 9"));
}

#[test]
fn too_many_ads_raise_the_warning_but_keep_every_block() {
    let layout = renderer().layout(&form_with_ads(14, 8)).unwrap();
    assert!(layout.warning);
    let placed = layout.placement.primary.len() + layout.placement.overflow.len();
    assert_eq!(placed, 14);
}

// ─── Watch ──────────────────────────────────────────────────────

#[test]
fn watch_renders_after_an_edit() {
    let dir = TempDir::new().unwrap();
    let store = FormStore::new(dir.path().join("form.json"));
    store.save(&FormState::default()).unwrap();
    let out = dir.path().join("out.pdf");

    let r = renderer();
    let render = || -> Result<(), JubboError> {
        let bytes = r.render_pdf(&store.load_or_default())?;
        std::fs::write(&out, bytes).map_err(|e| JubboError::Io {
            path: out.clone(),
            source: e,
        })
    };

    let mut lp = WatchLoop::new(store.path(), Duration::ZERO);
    assert!(lp.tick(render));
    assert!(out.exists());
    assert!(!lp.tick(render));

    let mut form = store.load_or_default();
    form.set_field("sermonTitle", "새 노래로 여호와께").unwrap();
    store.save(&form).unwrap();
    assert!(lp.tick(render));
}
