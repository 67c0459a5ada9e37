//! # PDF Serializer
//!
//! Takes the laid-out sheets and writes a PDF 1.7 file byte by byte.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, pages, content streams
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- root and info references
//! %%EOF
//! ```
//!
//! ## Fonts
//!
//! The standard Helvetica faces are referenced as Type1 fonts with
//! WinAnsiEncoding. They cannot show Hangul: such characters are written as
//! `?` and reported once per document. A configured TrueType font is
//! embedded whole as a CIDFontType2 with Identity-H encoding, which takes
//! five objects: FontFile2, FontDescriptor, CIDFont, ToUnicode CMap and the
//! Type0 root.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::{debug, warn};

use crate::error::JubboError;
use crate::font::{FontContext, FontData, FontKey};
use crate::layout::{qr_dark_modules, DrawCommand, LayoutElement, LayoutPage, PositionedGlyph};

/// Document information written to the Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

pub struct PdfWriter;

/// Glyph lookup for an embedded TrueType font.
struct CustomFontEmbedData {
    char_to_gid: HashMap<char, u16>,
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Resolved font key -> object id; `/F{index}` follows this order.
    font_objects: Vec<(FontKey, usize)>,
    custom_font_data: HashMap<FontKey, CustomFontEmbedData>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &PdfMetadata,
        font_context: &FontContext,
    ) -> Result<Vec<u8>, JubboError> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_font_data: HashMap::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: Vec::new() });
        }

        self.register_fonts(&mut builder, pages, font_context)?;

        let mut page_obj_ids = Vec::with_capacity(pages.len());
        let mut unencodable = 0usize;

        for page in pages {
            let content = self.build_content_stream(page, &builder, font_context, &mut unencodable);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >> >>",
                page.width,
                page.height,
                content_obj_id,
                Self::build_font_resource_dict(&builder.font_objects)
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        if unencodable > 0 {
            warn!(
                count = unencodable,
                "characters outside WinAnsi were written as '?'; configure fonts.regular with a Korean TrueType font"
            );
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.objects.len();
        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title {} ", Self::text_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author {} ", Self::text_string(author));
        }
        info.push_str("/Producer (jubbo) /Creator (jubbo) >>");
        builder.objects.push(PdfObject {
            data: info.into_bytes(),
        });

        let bytes = self.serialize(&builder, info_obj_id);
        debug!(pages = pages.len(), bytes = bytes.len(), "serialized PDF");
        Ok(bytes)
    }

    fn build_content_stream(
        &self,
        page: &LayoutPage,
        builder: &PdfBuilder,
        font_context: &FontContext,
        unencodable: &mut usize,
    ) -> String {
        let mut stream = String::new();
        for element in &page.elements {
            self.write_element(
                &mut stream,
                element,
                page.height,
                builder,
                font_context,
                unencodable,
            );
        }
        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        font_context: &FontContext,
        unencodable: &mut usize,
    ) {
        match &element.draw {
            DrawCommand::None => {}

            DrawCommand::Rect {
                background,
                border_width,
                border_color,
            } => {
                let x = element.x;
                let y = page_height - element.y - element.height;
                let (w, h) = (element.width, element.height);

                if let Some(bg) = background {
                    if bg.a > 0.0 {
                        let _ = writeln!(stream, "q\n{:.3} {:.3} {:.3} rg", bg.r, bg.g, bg.b);
                        let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re\nf\nQ", x, y, w, h);
                    }
                }
                if *border_width > 0.0 {
                    let bc = border_color;
                    let _ = writeln!(
                        stream,
                        "q\n{:.3} {:.3} {:.3} RG\n{:.2} w",
                        bc.r, bc.g, bc.b, border_width
                    );
                    let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re\nS\nQ", x, y, w, h);
                }
            }

            DrawCommand::Text { lines, color } => {
                let _ = writeln!(stream, "BT\n{:.3} {:.3} {:.3} rg", color.r, color.g, color.b);

                for line in lines {
                    let Some(first) = line.glyphs.first() else {
                        continue;
                    };
                    let key = Self::resolved_key(font_context, first);
                    let font_idx = Self::font_index(&key, &builder.font_objects);

                    let _ = writeln!(
                        stream,
                        "/F{} {:.1} Tf\n{:.3} Tc\n1 0 0 1 {:.2} {:.2} Tm",
                        font_idx,
                        first.font_size,
                        first.letter_spacing,
                        line.x,
                        page_height - line.y
                    );

                    if let Some(embed) = builder.custom_font_data.get(&key) {
                        let mut hex = String::with_capacity(line.glyphs.len() * 4);
                        for g in &line.glyphs {
                            let gid = embed.char_to_gid.get(&g.char_value).copied().unwrap_or(0);
                            let _ = write!(hex, "{:04X}", gid);
                        }
                        let _ = writeln!(stream, "<{}> Tj", hex);
                    } else {
                        let mut text = String::with_capacity(line.glyphs.len());
                        for g in &line.glyphs {
                            let b = match Self::unicode_to_winansi(g.char_value) {
                                Some(b) => b,
                                None => {
                                    *unencodable += 1;
                                    b'?'
                                }
                            };
                            match b {
                                b'\\' => text.push_str("\\\\"),
                                b'(' => text.push_str("\\("),
                                b')' => text.push_str("\\)"),
                                0x20..=0x7E => text.push(b as char),
                                _ => {
                                    let _ = write!(text, "\\{:03o}", b);
                                }
                            }
                        }
                        let _ = writeln!(stream, "({}) Tj", text);
                    }
                }

                stream.push_str("ET\n");
            }

            DrawCommand::Qr { modules, size } => {
                stream.push_str("q\n0 0 0 rg\n");
                for (x, y, side) in qr_dark_modules(element, modules, *size) {
                    let _ = writeln!(
                        stream,
                        "{:.3} {:.3} {:.3} {:.3} re",
                        x,
                        page_height - y - side,
                        side,
                        side
                    );
                }
                stream.push_str("f\nQ\n");
            }
        }

        for child in &element.children {
            self.write_element(stream, child, page_height, builder, font_context, unencodable);
        }
    }

    fn resolved_key(font_context: &FontContext, glyph: &PositionedGlyph) -> FontKey {
        font_context
            .registry()
            .resolved_key(&glyph.font_family, glyph.font_weight)
    }

    /// Register every font the pages use. Requests that fall back to the
    /// same face share one font object.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        font_context: &FontContext,
    ) -> Result<(), JubboError> {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            Self::collect_font_keys_and_chars(&page.elements, font_context, &mut font_chars);
        }

        if font_chars.is_empty() {
            font_chars.insert(FontKey::snapped("Helvetica", 400), BTreeSet::new());
        }

        for (key, used_chars) in &font_chars {
            match font_context.resolve(&key.family, key.weight) {
                FontData::Standard(std_font) => {
                    let obj_id = builder.objects.len();
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.objects.push(PdfObject {
                        data: font_dict.into_bytes(),
                    });
                    builder.font_objects.push((key.clone(), obj_id));
                }
                FontData::Custom { data, .. } => {
                    let type0_obj_id =
                        Self::write_custom_font_objects(builder, key, data, used_chars)?;
                    builder.font_objects.push((key.clone(), type0_obj_id));
                }
            }
        }

        Ok(())
    }

    fn collect_font_keys_and_chars(
        elements: &[LayoutElement],
        font_context: &FontContext,
        font_chars: &mut BTreeMap<FontKey, BTreeSet<char>>,
    ) {
        for element in elements {
            if let DrawCommand::Text { lines, .. } = &element.draw {
                for line in lines {
                    for glyph in &line.glyphs {
                        let key = Self::resolved_key(font_context, glyph);
                        font_chars.entry(key).or_default().insert(glyph.char_value);
                    }
                }
            }
            Self::collect_font_keys_and_chars(&element.children, font_context, font_chars);
        }
    }

    /// Write the 5 CIDFont PDF objects for a custom TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: &FontKey,
        ttf_data: &[u8],
        used_chars: &BTreeSet<char>,
    ) -> Result<usize, JubboError> {
        let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
            JubboError::Font(format!(
                "Failed to parse TTF data for font '{}': {}",
                key.family, e
            ))
        })?;

        let units_per_em = face.units_per_em();
        let scale = 1000.0 / units_per_em as f64;

        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|&ch| face.glyph_index(ch).map(|gid| (ch, gid.0)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(&key.family, key.weight);

        // 1. FontFile2 stream
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let fontfile2_id = builder.objects.len();
        let mut fontfile2_data: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile2_data,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed_ttf.len(),
            ttf_data.len()
        );
        fontfile2_data.extend_from_slice(&compressed_ttf);
        fontfile2_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: fontfile2_data,
        });

        // 2. FontDescriptor
        let font_descriptor_id = builder.objects.len();
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(face.ascender()) as f64 * scale;
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            (face.ascender() as f64 * scale) as i32,
            (face.descender() as f64 * scale) as i32,
            cap_height as i32,
            if key.weight >= 700 { 120 } else { 80 },
            fontfile2_id,
        );
        builder.objects.push(PdfObject {
            data: font_descriptor_dict.into_bytes(),
        });

        // 3. CIDFont dictionary (DescendantFont)
        let cidfont_id = builder.objects.len();
        let w_array = Self::build_w_array(&char_to_gid, |gid| {
            face.glyph_hor_advance(ttf_parser::GlyphId(gid))
                .map(|adv| (adv as f64 * scale) as u32)
                .unwrap_or(0)
        });
        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name, font_descriptor_id, default_width, w_array,
        );
        builder.objects.push(PdfObject {
            data: cidfont_dict.into_bytes(),
        });

        // 4. ToUnicode CMap
        let tounicode_id = builder.objects.len();
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let mut tounicode_data: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode_data.extend_from_slice(&compressed_cmap);
        tounicode_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: tounicode_data,
        });

        // 5. Type0 root
        let type0_id = builder.objects.len();
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        builder.objects.push(PdfObject {
            data: type0_dict.into_bytes(),
        });

        debug!(
            font = %pdf_font_name,
            glyphs = char_to_gid.len(),
            bytes = ttf_data.len(),
            "embedded TrueType font"
        );
        builder
            .custom_font_data
            .insert(key.clone(), CustomFontEmbedData { char_to_gid });

        Ok(type0_id)
    }

    /// Per-glyph widths for the CIDFont: `[gid [width] gid [width] ...]`.
    fn build_w_array(char_to_gid: &HashMap<char, u16>, width_of: impl Fn(u16) -> u32) -> String {
        let gids: BTreeSet<u16> = char_to_gid.values().copied().collect();
        let mut result = String::from("[");
        for gid in gids {
            let _ = write!(result, " {} [{}]", gid, width_of(gid));
        }
        result.push_str(" ]");
        result
    }

    /// ToUnicode CMap so text can be copied and searched.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        gid_to_unicode.sort_unstable();

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // At most 100 entries per bfchar block.
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }

    /// Strip characters that are not allowed in a PDF name and append
    /// the weight suffix.
    fn sanitize_font_name(family: &str, weight: u32) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            name = "CustomFont".to_string();
        }
        if weight >= 700 {
            name.push_str("-Bold");
        }
        name
    }

    fn build_font_resource_dict(font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `/F{n}` index of a resolved key; the first font as a last resort.
    fn font_index(key: &FontKey, font_objects: &[(FontKey, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(0)
    }

    /// A PDF text string: literal when ASCII, UTF-16BE hex with BOM otherwise.
    fn text_string(s: &str) -> String {
        if s.is_ascii() {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        // Windows-1252 0x80-0x9F
        match cp {
            0x20AC => Some(0x80),
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85),
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91),
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95),
            0x2013 => Some(0x96),
            0x2014 => Some(0x97),
            0x02DC => Some(0x98),
            0x2122 => Some(0x99),
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Typesetter, LayoutElement};
    use crate::style::{Color, TextStyle};

    fn page(elements: Vec<LayoutElement>) -> LayoutPage {
        LayoutPage {
            width: 728.5,
            height: 515.91,
            elements,
        }
    }

    fn write(pages: &[LayoutPage], metadata: &PdfMetadata) -> String {
        let ctx = FontContext::new();
        let bytes = PdfWriter::new().write(pages, metadata, &ctx).unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(PdfWriter::escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn empty_document_is_well_formed() {
        let text = write(&[page(vec![]), page(vec![])], &PdfMetadata::default());
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("/Count 2"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let ctx = FontContext::new();
        let bytes = PdfWriter::new()
            .write(&[page(vec![])], &PdfMetadata::default(), &ctx)
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        let xref_at = text.find("xref\n").unwrap();
        let first_entry = text[xref_at..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(bytes[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn korean_title_is_utf16_hex() {
        let text = write(
            &[page(vec![])],
            &PdfMetadata {
                title: Some("2026년 3월 1일 주보.pdf".into()),
                author: None,
            },
        );
        assert!(text.contains("/Title <FEFF0032003000320036B144"));
        assert_eq!(PdfWriter::text_string("Plain (x)"), "(Plain \\(x\\))");
    }

    #[test]
    fn bold_font_registered_separately() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let style = TextStyle::new("Helvetica", 12.0);
        let pages = [page(vec![
            ts.paragraph("A", 54.0, 54.0, 100.0, &style),
            ts.paragraph("A", 54.0, 74.0, 100.0, &style.clone().bold()),
        ])];
        let text = write(&pages, &PdfMetadata::default());
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        assert!(text.contains("/Type1"));
        assert!(!text.contains("CIDFontType2"));
    }

    #[test]
    fn fallback_family_shares_the_helvetica_object() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let pages = [page(vec![
            ts.paragraph("a", 0.0, 0.0, 100.0, &TextStyle::new("Helvetica", 10.0)),
            ts.paragraph("b", 0.0, 20.0, 100.0, &TextStyle::new("Bulletin", 10.0)),
        ])];
        let text = write(&pages, &PdfMetadata::default());
        assert_eq!(text.matches("/Subtype /Type1").count(), 1);
    }

    #[test]
    fn unencodable_chars_become_question_marks() {
        let ctx = FontContext::new();
        let ts = Typesetter::new(&ctx);
        let el = ts.paragraph("광고", 0.0, 0.0, 100.0, &TextStyle::new("Helvetica", 10.0));
        let mut unencodable = 0;
        let builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: vec![(FontKey::snapped("Helvetica", 400), 3)],
            custom_font_data: HashMap::new(),
        };
        let stream = PdfWriter::new().build_content_stream(
            &page(vec![el]),
            &builder,
            &ctx,
            &mut unencodable,
        );
        assert!(stream.contains("(??) Tj"));
        assert_eq!(unencodable, 2);
    }

    #[test]
    fn rects_and_qr_modules_are_filled() {
        let ctx = FontContext::new();
        let rule = LayoutElement::fill(10.0, 10.0, 100.0, 1.0, Color::RULE);
        let qr = LayoutElement {
            x: 0.0,
            y: 0.0,
            width: 50.0,
            height: 50.0,
            draw: DrawCommand::Qr {
                modules: vec![true, false, false, true],
                size: 2,
            },
            children: vec![],
        };
        let builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_font_data: HashMap::new(),
        };
        let mut n = 0;
        let pages = page(vec![rule, qr]);
        let stream = PdfWriter::new().build_content_stream(&pages, &builder, &ctx, &mut n);
        assert!(stream.contains("10.00 504.91 100.00 1.00 re"));
        assert_eq!(stream.matches(" re\n").count(), 3);
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(PdfWriter::sanitize_font_name("Bulletin", 400), "Bulletin");
        assert_eq!(PdfWriter::sanitize_font_name("Bulletin", 700), "Bulletin-Bold");
        assert_eq!(PdfWriter::sanitize_font_name("Noto Sans", 400), "NotoSans");
        assert_eq!(PdfWriter::sanitize_font_name("나눔", 400), "CustomFont");
    }

    #[test]
    fn test_tounicode_cmap_format() {
        let mut char_to_gid = HashMap::new();
        char_to_gid.insert('A', 36u16);
        char_to_gid.insert('광', 900u16);

        let cmap = PdfWriter::build_tounicode_cmap(&char_to_gid, "TestFont");
        assert!(cmap.contains("begincodespacerange"));
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0384> <AD11>"));
    }

    #[test]
    fn test_w_array_format() {
        let mut char_to_gid = HashMap::new();
        char_to_gid.insert('B', 37u16);
        char_to_gid.insert('A', 36u16);
        let w = PdfWriter::build_w_array(&char_to_gid, |gid| gid as u32 * 10);
        assert_eq!(w, "[ 36 [360] 37 [370] ]");
    }
}
