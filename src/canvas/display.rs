//! # Display Canvas
//!
//! The reference [`Canvas`]: a display list. Every drawing call is recorded
//! as a [`DrawOp`] on the current page, with paint state and text layout
//! already resolved, and [`Canvas::save_image`] hands the list to the PDF
//! serializer.
//!
//! Measurement goes through a [`FontBook`]. Until fonts are registered all
//! text is measured as Courier, which makes layout results exact and
//! reproducible; tests rely on that.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::{Canvas, Point};
use crate::error::QuireError;
use crate::font::FontBook;
use crate::style::{Color, TextAlign};
use crate::text::lines::{self, Line};
use crate::text::RichText;

/// A4 portrait, used until `new_document` says otherwise.
const DEFAULT_PAGE_SIZE: (f64, f64) = (595.28, 841.89);

/// A run of same-styled characters on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub font: String,
    pub size: f64,
    pub fill: Option<Color>,
    /// Offset from the line's x.
    pub dx: f64,
}

/// One line of placed text, positioned by its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub segments: Vec<TextSegment>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    Oval {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Option<(Color, f64)>,
    },
    Image {
        path: PathBuf,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Scale {
        sx: f64,
        sy: f64,
    },
    Text {
        lines: Vec<TextLine>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPage {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

impl DisplayPage {
    /// All placed text on the page, one string per line.
    pub fn text_lines(&self) -> Vec<String> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { lines } => Some(lines.iter().map(TextLine::text).collect::<Vec<_>>()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DisplayCanvas {
    fonts: FontBook,
    pages: Vec<DisplayPage>,
    page_size: (f64, f64),
    fill: Option<Color>,
    stroke: Option<Color>,
    stroke_width: f64,
    hyphenation: bool,
    font: String,
    font_size: f64,
    title: Option<String>,
}

impl Default for DisplayCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayCanvas {
    pub fn new() -> Self {
        Self {
            fonts: FontBook::new(),
            pages: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 1.0,
            hyphenation: false,
            font: crate::style::DEFAULT_FONT.to_string(),
            font_size: crate::style::DEFAULT_FONT_SIZE,
            title: None,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Register a TrueType font for measurement and embedding.
    pub fn register_font(&mut self, name: &str, data: Vec<u8>) -> Result<(), QuireError> {
        self.fonts.register(name, data)
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn pages(&self) -> &[DisplayPage] {
        &self.pages
    }

    /// Serialize the recorded pages to PDF bytes.
    pub fn to_pdf(&self, multi_page: bool) -> Result<Vec<u8>, QuireError> {
        let blank;
        let pages: &[DisplayPage] = if self.pages.is_empty() {
            blank = [DisplayPage {
                width: self.page_size.0,
                height: self.page_size.1,
                ops: Vec::new(),
            }];
            &blank
        } else if multi_page {
            &self.pages
        } else {
            &self.pages[..1]
        };
        crate::pdf::write(pages, &self.fonts, self.title.as_deref())
    }

    fn current_page(&mut self) -> &mut DisplayPage {
        if self.pages.is_empty() {
            let (width, height) = self.page_size;
            self.pages.push(DisplayPage {
                width,
                height,
                ops: Vec::new(),
            });
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn push(&mut self, op: DrawOp) {
        self.current_page().ops.push(op);
    }

    fn paint_stroke(&self) -> Option<(Color, f64)> {
        self.stroke
            .filter(|_| self.stroke_width > 0.0)
            .map(|c| (c, self.stroke_width))
    }

    /// Apply the canvas hyphenation default to text that does not ask for it.
    fn prepare<'a>(&self, text: &'a RichText) -> Cow<'a, RichText> {
        if self.hyphenation && !text.hyphenation {
            let mut owned = text.clone();
            owned.hyphenation = true;
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(text)
        }
    }

    fn place_line(&self, text: &RichText, line: &Line, x: f64, y: f64) -> TextLine {
        let mut segments: Vec<TextSegment> = Vec::new();
        let mut current: Option<usize> = None;
        for (k, &(ch, span)) in line.chars.iter().enumerate() {
            if current == Some(span) {
                if let Some(seg) = segments.last_mut() {
                    seg.text.push(ch);
                }
                continue;
            }
            let attrs = &text.spans[span].attrs;
            segments.push(TextSegment {
                text: ch.to_string(),
                font: attrs.font.clone(),
                size: attrs.font_size,
                fill: attrs.fill,
                dx: line.positions[k],
            });
            current = Some(span);
        }
        TextLine {
            x,
            y,
            width: line.width,
            segments,
        }
    }
}

fn line_align(text: &RichText, line: &Line) -> TextAlign {
    line.chars
        .first()
        .map(|&(_, span)| text.spans[span].attrs.align)
        .unwrap_or_default()
}

impl Canvas for DisplayCanvas {
    fn new_document(&mut self, w: f64, h: f64) {
        self.pages.clear();
        self.page_size = (w, h);
    }

    fn new_page(&mut self, w: f64, h: f64) {
        self.pages.push(DisplayPage {
            width: w,
            height: h,
            ops: Vec::new(),
        });
    }

    fn save_image(&mut self, path: &Path, multi_page: bool) -> Result<(), QuireError> {
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(QuireError::Export(format!(
                "unsupported output format: {}",
                path.display()
            )));
        }
        let bytes = self.to_pdf(multi_page)?;
        std::fs::write(path, &bytes)?;
        log::info!(
            "Wrote {} ({} bytes, {} pages)",
            path.display(),
            bytes.len(),
            if multi_page { self.pages.len().max(1) } else { 1 }
        );
        Ok(())
    }

    fn fill(&mut self, color: Option<Color>) {
        self.fill = color;
    }

    fn stroke(&mut self, color: Option<Color>, width: f64) {
        self.stroke = color;
        self.stroke_width = width;
    }

    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let op = DrawOp::Rect {
            x,
            y,
            w,
            h,
            fill: self.fill,
            stroke: self.paint_stroke(),
        };
        self.push(op);
    }

    fn oval(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let op = DrawOp::Oval {
            x,
            y,
            w,
            h,
            fill: self.fill,
            stroke: self.paint_stroke(),
        };
        self.push(op);
    }

    fn line(&mut self, p1: Point, p2: Point) {
        let op = DrawOp::Line {
            from: p1,
            to: p2,
            stroke: self.paint_stroke(),
        };
        self.push(op);
    }

    fn image(&mut self, path: &Path, p: Point, w: Option<f64>, h: Option<f64>) -> Result<(), QuireError> {
        let (iw, ih) = self.image_size(path)?;
        let (w, h) = match (w, h) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, if iw > 0.0 { w * ih / iw } else { ih }),
            (None, Some(h)) => (if ih > 0.0 { h * iw / ih } else { iw }, h),
            (None, None) => (iw, ih),
        };
        self.push(DrawOp::Image {
            path: path.to_path_buf(),
            x: p.x,
            y: p.y,
            w,
            h,
        });
        Ok(())
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.push(DrawOp::Scale { sx, sy });
    }

    fn text(&mut self, text: &RichText, p: Point) {
        let text = self.prepare(text);
        let mut y = p.y;
        let mut placed = Vec::new();
        for line in lines::break_lines(&text, None, &self.fonts) {
            let x = match line_align(&text, &line) {
                TextAlign::Center => p.x - line.width / 2.0,
                TextAlign::Right => p.x - line.width,
                TextAlign::Left | TextAlign::Justify => p.x,
            };
            placed.push(self.place_line(&text, &line, x, y));
            y -= line.height;
        }
        if !placed.is_empty() {
            self.push(DrawOp::Text { lines: placed });
        }
    }

    fn text_box(&mut self, text: &RichText, x: f64, y: f64, w: f64, h: f64) -> RichText {
        let text = self.prepare(text);
        let fit = lines::fit_lines(&text, w, h, &self.fonts);
        let mut cursor = y + h;
        let mut placed = Vec::with_capacity(fit.lines.len());
        for line in &fit.lines {
            let dx = match line_align(&text, line) {
                TextAlign::Center => (w - line.width) / 2.0,
                TextAlign::Right => w - line.width,
                TextAlign::Left | TextAlign::Justify => 0.0,
            };
            placed.push(self.place_line(&text, line, x + dx, cursor - line.ascent));
            cursor -= line.height;
        }
        if !placed.is_empty() {
            self.push(DrawOp::Text { lines: placed });
        }
        text.slice_from(fit.consumed)
    }

    fn fit_text(&mut self, text: &RichText, w: f64, h: f64) -> RichText {
        let text = self.prepare(text);
        let fit = lines::fit_lines(&text, w, h, &self.fonts);
        text.slice_from(fit.consumed)
    }

    fn text_size(&mut self, text: &RichText, w: Option<f64>, h: Option<f64>) -> (f64, f64) {
        let text = self.prepare(text);
        match h {
            Some(h) => {
                let fit = lines::fit_lines(&text, w.unwrap_or(f64::INFINITY), h, &self.fonts);
                lines::measure(&fit.lines)
            }
            None => lines::measure(&lines::break_lines(&text, w, &self.fonts)),
        }
    }

    fn hyphenation(&mut self, on: bool) {
        self.hyphenation = on;
    }

    fn font(&mut self, name: &str, size: f64) {
        self.font = name.to_string();
        self.font_size = size;
    }

    fn font_ascender(&self) -> f64 {
        let m = self.fonts.metrics(&self.font);
        m.scale(m.ascender, self.font_size)
    }

    fn font_descender(&self) -> f64 {
        let m = self.fonts.metrics(&self.font);
        m.scale(m.descender, self.font_size)
    }

    fn font_x_height(&self) -> f64 {
        let m = self.fonts.metrics(&self.font);
        m.scale(m.x_height, self.font_size)
    }

    fn font_cap_height(&self) -> f64 {
        let m = self.fonts.metrics(&self.font);
        m.scale(m.cap_height, self.font_size)
    }

    fn image_size(&self, path: &Path) -> Result<(f64, f64), QuireError> {
        let (w, h) = crate::image_loader::image_size(path)?;
        Ok((w as f64, h as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextAttributes;

    fn rich(text: &str, size: f64, align: TextAlign) -> RichText {
        let mut rt = RichText::new();
        rt.push(
            text,
            &TextAttributes {
                font_size: size,
                line_height: size * 2.0,
                align,
                ..Default::default()
            },
        );
        rt
    }

    #[test]
    fn test_drawing_creates_first_page() {
        let mut canvas = DisplayCanvas::new();
        canvas.fill(Some(Color::WHITE));
        canvas.rect(1.0, 2.0, 3.0, 4.0);
        assert_eq!(canvas.pages().len(), 1);
        assert_eq!(canvas.pages()[0].width, DEFAULT_PAGE_SIZE.0);
        assert_eq!(
            canvas.pages()[0].ops[0],
            DrawOp::Rect {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
                fill: Some(Color::WHITE),
                stroke: None,
            }
        );
    }

    #[test]
    fn test_new_document_resets_pages() {
        let mut canvas = DisplayCanvas::new();
        canvas.new_page(100.0, 100.0);
        canvas.new_page(100.0, 100.0);
        canvas.new_document(300.0, 200.0);
        assert!(canvas.pages().is_empty());
        canvas.oval(0.0, 0.0, 10.0, 10.0);
        assert_eq!(canvas.pages()[0].height, 200.0);
    }

    #[test]
    fn test_zero_stroke_width_is_not_recorded() {
        let mut canvas = DisplayCanvas::new();
        canvas.stroke(Some(Color::BLACK), 0.0);
        canvas.line(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        assert!(matches!(canvas.pages()[0].ops[0], DrawOp::Line { stroke: None, .. }));
    }

    #[test]
    fn test_text_box_places_lines_from_top() {
        let mut canvas = DisplayCanvas::new();
        // Size 10: 6pt per char, 20pt lines; two lines fit in 45pt.
        let rest = canvas.text_box(&rich("aaa bbb ccc", 10.0, TextAlign::Left), 10.0, 100.0, 30.0, 45.0);
        assert_eq!(rest.plain_text(), "ccc");

        let page = &canvas.pages()[0];
        let DrawOp::Text { lines } = &page.ops[0] else {
            panic!("expected text");
        };
        assert_eq!(lines.len(), 2);
        assert!((lines[0].y - (145.0 - 6.29)).abs() < 1e-9);
        assert!((lines[1].y - (125.0 - 6.29)).abs() < 1e-9);
        assert_eq!(page.text_lines(), vec!["aaa ", "bbb "]);
    }

    #[test]
    fn test_fit_text_does_not_draw() {
        let mut canvas = DisplayCanvas::new();
        let rest = canvas.fit_text(&rich("aaa bbb ccc", 10.0, TextAlign::Left), 30.0, 45.0);
        assert_eq!(rest.plain_text(), "ccc");
        assert!(canvas.pages().is_empty());
    }

    #[test]
    fn test_text_alignment_around_point() {
        let mut canvas = DisplayCanvas::new();
        canvas.text(&rich("abcd", 10.0, TextAlign::Right), Point::new(100.0, 50.0));
        canvas.text(&rich("abcd", 10.0, TextAlign::Center), Point::new(100.0, 50.0));
        let ops = &canvas.pages()[0].ops;
        let DrawOp::Text { lines } = &ops[0] else { panic!() };
        assert!((lines[0].x - 76.0).abs() < 1e-9);
        let DrawOp::Text { lines } = &ops[1] else { panic!() };
        assert!((lines[0].x - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_size_with_and_without_width() {
        let mut canvas = DisplayCanvas::new();
        let text = rich("aaa bbb", 10.0, TextAlign::Left);
        let (w, h) = canvas.text_size(&text, None, None);
        assert!((w - 42.0).abs() < 1e-9);
        assert!((h - 20.0).abs() < 1e-9);
        let (w, h) = canvas.text_size(&text, Some(30.0), None);
        assert!((w - 18.0).abs() < 1e-9);
        assert!((h - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_font_metrics_follow_selected_font() {
        let mut canvas = DisplayCanvas::new();
        canvas.font("Courier", 100.0);
        assert!((canvas.font_ascender() - 62.9).abs() < 1e-9);
        assert!((canvas.font_descender() + 15.7).abs() < 1e-9);
        assert!((canvas.font_x_height() - 42.6).abs() < 1e-9);
        assert!((canvas.font_cap_height() - 56.2).abs() < 1e-9);
    }

    #[test]
    fn test_save_image_rejects_other_formats() {
        let mut canvas = DisplayCanvas::new();
        let err = canvas.save_image(Path::new("out.png"), true).unwrap_err();
        assert!(matches!(err, QuireError::Export(_)));
    }

    #[test]
    fn test_single_page_export() {
        let mut canvas = DisplayCanvas::new();
        canvas.new_page(100.0, 100.0);
        canvas.new_page(100.0, 100.0);
        let one = String::from_utf8_lossy(&canvas.to_pdf(false).unwrap()).to_string();
        let all = String::from_utf8_lossy(&canvas.to_pdf(true).unwrap()).to_string();
        assert!(one.contains("/Count 1"));
        assert!(all.contains("/Count 2"));
    }
}
