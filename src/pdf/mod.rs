//! # PDF Serializer
//!
//! Writes the pages recorded by [`DisplayCanvas`](crate::canvas::display::DisplayCanvas)
//! as a PDF 1.7 file.
//!
//! This is a from-scratch writer. The engine's coordinate system already
//! matches PDF user space (origin bottom-left, y up, points), so draw ops
//! translate to content-stream operators one to one.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages, streams
//! ...
//! xref                <- byte offset of every object
//! trailer             <- points to the catalog
//! %%EOF
//! ```
//!
//! Standard fonts are plain Type1 references with WinAnsiEncoding. Registered
//! TrueType fonts are embedded whole as simple TrueType fonts (FontFile2)
//! with a /Widths array over the WinAnsi range.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;
use std::path::PathBuf;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::canvas::display::{DisplayPage, DrawOp, TextLine};
use crate::error::QuireError;
use crate::font::{CustomFont, FontBook, FontFace};
use crate::image_loader::{load_image, ImagePixelData, JpegColorSpace, LoadedImage};
use crate::style::Color;

/// Bezier control-point factor for a quarter ellipse.
const KAPPA: f64 = 0.552_284_749_8;

const FIRST_CHAR: u8 = 32;
const LAST_CHAR: u8 = 255;

struct PdfObject {
    data: Vec<u8>,
}

/// Tracks allocated objects and the resource names assigned to fonts and
/// images while writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Resolved font key -> (/F index, object id).
    fonts: BTreeMap<String, (usize, usize)>,
    /// Image path -> (/Im index, object id).
    images: BTreeMap<PathBuf, (usize, usize)>,
}

impl PdfBuilder {
    fn new() -> Self {
        // Object 0 is the free-list head; 1 is the catalog, 2 the page tree.
        let objects = (0..3).map(|_| PdfObject { data: Vec::new() }).collect();
        Self {
            objects,
            fonts: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(PdfObject { data });
        self.objects.len() - 1
    }

    fn push_stream(&mut self, dict_entries: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} /Filter /FlateDecode >>\nstream\n",
            dict_entries,
            compressed.len()
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

/// Key under which a font name is embedded; names that resolve to the same
/// face share one font object.
fn font_key(fonts: &FontBook, name: &str) -> String {
    match fonts.resolve(name) {
        FontFace::Standard(std) => std.pdf_name().to_string(),
        FontFace::Custom(_) => format!("custom:{}", name),
    }
}

/// Serialize pages to PDF bytes.
pub fn write(pages: &[DisplayPage], fonts: &FontBook, title: Option<&str>) -> Result<Vec<u8>, QuireError> {
    let mut builder = PdfBuilder::new();
    register_fonts(&mut builder, pages, fonts)?;
    register_images(&mut builder, pages)?;

    let font_resources: String = builder
        .fonts
        .values()
        .map(|(idx, id)| format!("/F{} {} 0 R", idx, id))
        .collect::<Vec<_>>()
        .join(" ");

    let mut page_ids = Vec::with_capacity(pages.len());
    for page in pages {
        let content = content_stream(page, &builder, fonts);
        let content_id = builder.push_stream("", content.as_bytes());

        let xobjects: String = page_images(page)
            .iter()
            .filter_map(|path| builder.images.get(*path))
            .map(|(idx, id)| format!("/Im{} {} 0 R", idx, id))
            .collect::<Vec<_>>()
            .join(" ");
        let mut resources = format!("/Font << {} >>", font_resources);
        if !xobjects.is_empty() {
            let _ = write!(resources, " /XObject << {} >>", xobjects);
        }
        let page_dict = format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Contents {} 0 R /Resources << {} >> >>",
            page.width, page.height, content_id, resources
        );
        page_ids.push(builder.push(page_dict.into_bytes()));
    }

    builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    builder.objects[2].data =
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).into_bytes();

    let mut info = String::from("<< ");
    if let Some(title) = title {
        let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
    }
    info.push_str("/Producer (Quire) >>");
    let info_id = builder.push(info.into_bytes());

    Ok(serialize(&builder, info_id))
}

fn text_lines(page: &DisplayPage) -> impl Iterator<Item = &TextLine> {
    page.ops.iter().flat_map(|op| match op {
        DrawOp::Text { lines } => lines.as_slice(),
        _ => &[],
    })
}

fn page_images(page: &DisplayPage) -> Vec<&PathBuf> {
    let mut paths: Vec<&PathBuf> = page
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Image { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

fn register_fonts(builder: &mut PdfBuilder, pages: &[DisplayPage], fonts: &FontBook) -> Result<(), QuireError> {
    let mut names: Vec<&str> = pages
        .iter()
        .flat_map(text_lines)
        .flat_map(|line| line.segments.iter().map(|s| s.font.as_str()))
        .collect();
    names.sort_unstable();
    names.dedup();

    for name in names {
        let key = font_key(fonts, name);
        if builder.fonts.contains_key(&key) {
            continue;
        }
        let id = match fonts.resolve(name) {
            FontFace::Standard(std) => builder.push(
                format!(
                    "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                    std.pdf_name()
                )
                .into_bytes(),
            ),
            FontFace::Custom(font) => write_truetype_font(builder, name, font)?,
        };
        let idx = builder.fonts.len();
        builder.fonts.insert(key, (idx, id));
    }
    Ok(())
}

/// Embed a TrueType font as a simple font: FontFile2, FontDescriptor and the
/// font dictionary with per-code widths.
fn write_truetype_font(builder: &mut PdfBuilder, name: &str, font: &CustomFont) -> Result<usize, QuireError> {
    let face = ttf_parser::Face::parse(&font.data, 0)
        .map_err(|e| QuireError::Font(format!("Failed to parse TTF data for font '{}': {}", name, e)))?;
    let pdf_name = sanitize_font_name(name);
    let scale = 1000.0 / font.metrics.units_per_em as f64;

    let fontfile_id = builder.push_stream(&format!("/Length1 {}", font.data.len()), &font.data);

    let bbox = face.global_bounding_box();
    let descriptor = format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 32 \
         /FontBBox [{} {} {} {}] /ItalicAngle {} \
         /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
         /FontFile2 {} 0 R >>",
        pdf_name,
        (bbox.x_min as f64 * scale) as i32,
        (bbox.y_min as f64 * scale) as i32,
        (bbox.x_max as f64 * scale) as i32,
        (bbox.y_max as f64 * scale) as i32,
        if face.is_italic() { -12 } else { 0 },
        (font.metrics.ascender as f64 * scale) as i32,
        (font.metrics.descender as f64 * scale) as i32,
        (font.metrics.cap_height as f64 * scale) as i32,
        fontfile_id,
    );
    let descriptor_id = builder.push(descriptor.into_bytes());

    let mut widths = String::new();
    for code in FIRST_CHAR..=LAST_CHAR {
        let advance = winansi_to_unicode(code)
            .and_then(|ch| font.advance_widths.get(&ch).copied())
            .unwrap_or(font.default_advance);
        let _ = write!(widths, "{} ", (advance as f64 * scale).round() as i32);
    }
    let dict = format!(
        "<< /Type /Font /Subtype /TrueType /BaseFont /{} \
         /FirstChar {} /LastChar {} /Widths [{}] \
         /Encoding /WinAnsiEncoding /FontDescriptor {} 0 R >>",
        pdf_name,
        FIRST_CHAR,
        LAST_CHAR,
        widths.trim_end(),
        descriptor_id
    );
    Ok(builder.push(dict.into_bytes()))
}

fn register_images(builder: &mut PdfBuilder, pages: &[DisplayPage]) -> Result<(), QuireError> {
    for page in pages {
        for path in page_images(page) {
            if builder.images.contains_key(path) {
                continue;
            }
            let image = load_image(path)?;
            let id = write_image_xobject(builder, &image);
            let idx = builder.images.len();
            builder.images.insert(path.clone(), (idx, id));
        }
    }
    Ok(())
}

fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
    match &image.pixel_data {
        ImagePixelData::Jpeg { data, color_space } => {
            let color_space = match color_space {
                JpegColorSpace::DeviceRGB => "/DeviceRGB",
                JpegColorSpace::DeviceGray => "/DeviceGray",
            };
            let mut obj: Vec<u8> = Vec::new();
            let _ = write!(
                obj,
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
                image.width_px,
                image.height_px,
                color_space,
                data.len()
            );
            obj.extend_from_slice(data);
            obj.extend_from_slice(b"\nendstream");
            builder.push(obj)
        }
        ImagePixelData::Decoded { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let entries = format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8",
                    image.width_px, image.height_px
                );
                builder.push_stream(&entries, alpha)
            });
            let mut entries = format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8",
                image.width_px, image.height_px
            );
            if let Some(id) = smask {
                let _ = write!(entries, " /SMask {} 0 R", id);
            }
            builder.push_stream(&entries, rgb)
        }
    }
}

fn set_fill(stream: &mut String, c: Color) {
    let _ = writeln!(stream, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
}

fn set_stroke(stream: &mut String, c: Color, width: f64) {
    let _ = writeln!(stream, "{:.3} {:.3} {:.3} RG {:.2} w", c.r, c.g, c.b, width);
}

/// Paint operator for a closed path with the given fill and stroke.
fn paint(stream: &mut String, fill: Option<Color>, stroke: Option<(Color, f64)>) {
    let op = match (fill, stroke) {
        (Some(_), Some(_)) => "B",
        (Some(_), None) => "f",
        (None, Some(_)) => "S",
        (None, None) => "n",
    };
    let _ = writeln!(stream, "{}", op);
}

fn oval_path(stream: &mut String, x: f64, y: f64, w: f64, h: f64) {
    let (rx, ry) = (w / 2.0, h / 2.0);
    let (cx, cy) = (x + rx, y + ry);
    let (kx, ky) = (rx * KAPPA, ry * KAPPA);
    let _ = writeln!(stream, "{:.2} {:.2} m", cx + rx, cy);
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx + rx,
        cy + ky,
        cx + kx,
        cy + ry,
        cx,
        cy + ry
    );
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - kx,
        cy + ry,
        cx - rx,
        cy + ky,
        cx - rx,
        cy
    );
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - rx,
        cy - ky,
        cx - kx,
        cy - ry,
        cx,
        cy - ry
    );
    let _ = writeln!(
        stream,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx + kx,
        cy - ry,
        cx + rx,
        cy - ky,
        cx + rx,
        cy
    );
}

fn content_stream(page: &DisplayPage, builder: &PdfBuilder, fonts: &FontBook) -> String {
    let mut stream = String::new();
    for op in &page.ops {
        match op {
            DrawOp::Rect { x, y, w, h, fill, stroke } => {
                if fill.is_none() && stroke.is_none() {
                    continue;
                }
                let _ = writeln!(stream, "q");
                if let Some(c) = fill {
                    set_fill(&mut stream, *c);
                }
                if let Some((c, width)) = stroke {
                    set_stroke(&mut stream, *c, *width);
                }
                let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, y, w, h);
                paint(&mut stream, *fill, *stroke);
                let _ = writeln!(stream, "Q");
            }
            DrawOp::Oval { x, y, w, h, fill, stroke } => {
                if fill.is_none() && stroke.is_none() {
                    continue;
                }
                let _ = writeln!(stream, "q");
                if let Some(c) = fill {
                    set_fill(&mut stream, *c);
                }
                if let Some((c, width)) = stroke {
                    set_stroke(&mut stream, *c, *width);
                }
                oval_path(&mut stream, *x, *y, *w, *h);
                paint(&mut stream, *fill, *stroke);
                let _ = writeln!(stream, "Q");
            }
            DrawOp::Line { from, to, stroke } => {
                if let Some((c, width)) = stroke {
                    let _ = writeln!(stream, "q");
                    set_stroke(&mut stream, *c, *width);
                    let _ = writeln!(stream, "{:.2} {:.2} m {:.2} {:.2} l S", from.x, from.y, to.x, to.y);
                    let _ = writeln!(stream, "Q");
                }
            }
            DrawOp::Image { path, x, y, w, h } => {
                if let Some((idx, _)) = builder.images.get(path) {
                    let _ = writeln!(stream, "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im{} Do Q", w, h, x, y, idx);
                }
            }
            DrawOp::Scale { sx, sy } => {
                let _ = writeln!(stream, "{:.4} 0 0 {:.4} 0 0 cm", sx, sy);
            }
            DrawOp::Text { lines } => {
                for line in lines {
                    for segment in &line.segments {
                        let Some(fill) = segment.fill else {
                            continue;
                        };
                        let Some((idx, _)) = builder.fonts.get(&font_key(fonts, &segment.font)) else {
                            continue;
                        };
                        let _ = writeln!(stream, "BT");
                        set_fill(&mut stream, fill);
                        let _ = writeln!(stream, "/F{} {:.2} Tf", idx, segment.size);
                        let _ = writeln!(stream, "{:.2} {:.2} Td", line.x + segment.dx, line.y);
                        let _ = writeln!(stream, "({}) Tj", encode_winansi(&segment.text));
                        let _ = writeln!(stream, "ET");
                    }
                }
            }
        }
    }
    stream
}

/// Encode text as a WinAnsi literal string body. Unmappable characters
/// become `?`; bytes outside printable ASCII are written as octal escapes.
fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let byte = unicode_to_winansi(ch).unwrap_or(b'?');
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Strip everything that is not allowed in a PDF name.
fn sanitize_font_name(name: &str) -> String {
    let clean: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if clean.is_empty() {
        "CustomFont".to_string()
    } else {
        clean
    }
}

/// Windows-1252 code points 0x80..=0x9F that differ from Latin-1.
const WINANSI_SPECIALS: [(u32, u8); 27] = [
    (0x20AC, 0x80),
    (0x201A, 0x82),
    (0x0192, 0x83),
    (0x201E, 0x84),
    (0x2026, 0x85),
    (0x2020, 0x86),
    (0x2021, 0x87),
    (0x02C6, 0x88),
    (0x2030, 0x89),
    (0x0160, 0x8A),
    (0x2039, 0x8B),
    (0x0152, 0x8C),
    (0x017D, 0x8E),
    (0x2018, 0x91),
    (0x2019, 0x92),
    (0x201C, 0x93),
    (0x201D, 0x94),
    (0x2022, 0x95),
    (0x2013, 0x96),
    (0x2014, 0x97),
    (0x02DC, 0x98),
    (0x2122, 0x99),
    (0x0161, 0x9A),
    (0x203A, 0x9B),
    (0x0153, 0x9C),
    (0x017E, 0x9E),
    (0x0178, 0x9F),
];

fn unicode_to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    WINANSI_SPECIALS.iter().find(|(u, _)| *u == cp).map(|(_, b)| *b)
}

fn winansi_to_unicode(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
        _ => WINANSI_SPECIALS
            .iter()
            .find(|(_, b)| *b == byte)
            .and_then(|(u, _)| char::from_u32(*u)),
    }
}

fn serialize(builder: &PdfBuilder, info_id: usize) -> Vec<u8> {
    let mut output: Vec<u8> = Vec::new();
    let mut offsets = vec![0usize; builder.objects.len()];

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
    let _ = write!(output, "0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        let _ = write!(output, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        output,
        "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
        builder.objects.len(),
        info_id,
        xref_offset
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::display::TextSegment;
    use crate::canvas::Point;

    fn page(ops: Vec<DrawOp>) -> DisplayPage {
        DisplayPage {
            width: 200.0,
            height: 100.0,
            ops,
        }
    }

    fn text_op(font: &str, text: &str) -> DrawOp {
        DrawOp::Text {
            lines: vec![TextLine {
                x: 10.0,
                y: 20.0,
                width: 0.0,
                segments: vec![TextSegment {
                    text: text.to_string(),
                    font: font.to_string(),
                    size: 12.0,
                    fill: Some(Color::BLACK),
                    dx: 0.0,
                }],
            }],
        }
    }

    fn lossy(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).to_string()
    }

    #[test]
    fn test_encode_winansi() {
        assert_eq!(encode_winansi("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(encode_winansi("back\\slash"), "back\\\\slash");
        assert_eq!(encode_winansi("caf\u{e9}"), "caf\\351");
        assert_eq!(encode_winansi("\u{2014}"), "\\227");
        assert_eq!(encode_winansi("\u{4e2d}"), "?");
    }

    #[test]
    fn test_winansi_mapping_is_symmetric() {
        for byte in FIRST_CHAR..=LAST_CHAR {
            if let Some(ch) = winansi_to_unicode(byte) {
                assert_eq!(unicode_to_winansi(ch), Some(byte));
            }
        }
    }

    #[test]
    fn test_empty_page_produces_valid_pdf() {
        let bytes = write(&[page(vec![])], &FontBook::new(), None).unwrap();
        let text = lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/MediaBox [0 0 200.00 100.00]"));
    }

    #[test]
    fn test_title_in_info() {
        let bytes = write(&[page(vec![])], &FontBook::new(), Some("A (draft)")).unwrap();
        assert!(lossy(&bytes).contains("/Title (A \\(draft\\))"));
    }

    #[test]
    fn test_fonts_shared_by_resolved_face() {
        let pages = vec![
            page(vec![text_op("Courier", "a"), text_op("Helvetica", "b")]),
            page(vec![text_op("Courier-Bold", "c")]),
        ];
        let text = lossy(&write(&pages, &FontBook::new(), None).unwrap());
        assert_eq!(text.matches("/Subtype /Type1").count(), 2);
        assert!(text.contains("/BaseFont /Courier "));
        assert!(text.contains("/BaseFont /Courier-Bold "));
        assert!(text.contains("/Count 2"));
    }

    #[test]
    fn test_shapes_emit_paint_operators() {
        let ops = vec![
            DrawOp::Rect {
                x: 0.0,
                y: 0.0,
                w: 10.0,
                h: 10.0,
                fill: Some(Color::WHITE),
                stroke: Some((Color::BLACK, 1.0)),
            },
            DrawOp::Line {
                from: Point::new(0.0, 0.0),
                to: Point::new(5.0, 5.0),
                stroke: Some((Color::BLACK, 0.5)),
            },
        ];
        let stream = content_stream(&page(ops), &PdfBuilder::new(), &FontBook::new());
        assert!(stream.contains("0.00 0.00 10.00 10.00 re\nB"));
        assert!(stream.contains("0.00 0.00 m 5.00 5.00 l S"));
    }

    #[test]
    fn test_missing_image_fails() {
        let ops = vec![DrawOp::Image {
            path: PathBuf::from("/nonexistent/quire.png"),
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        }];
        assert!(write(&[page(ops)], &FontBook::new(), None).is_err());
    }
}
