//! # Element Tree
//!
//! Everything placed on a page is an [`Element`]: a geometric node with a
//! position relative to its parent, an optional size, paint, padding and
//! owned children. What an element draws is decided by its [`ElementKind`],
//! a closed set of variants dispatched per drawing phase inside one
//! [`Element::build`].
//!
//! Two passes run over a page tree:
//!
//! 1. **Compose.** Element-bound templates run and may add or replace
//!    children. Compose sees the theme and a read-only view of the document
//!    but never the canvas.
//! 2. **Build.** Each element draws background, content, children and
//!    foreground, in that order, at its absolute origin: the parent's
//!    origin plus its own `(x, y)`. The parent's size travels down as a
//!    [`Frame`] value; there are no parent pointers.

pub mod image;
pub mod marker;
pub mod text_box;

use std::fmt;

use crate::canvas::{Canvas, Point};
use crate::config::Edges;
use crate::error::QuireError;
use crate::style::Color;
use crate::template::TocEntry;
use crate::text::BabelString;
use crate::theme::Theme;

pub use image::Image;
pub use marker::Marker;
pub use text_box::TextBox;

/// What an element-bound template sees while composing.
#[derive(Debug, Clone, Copy)]
pub struct ComposeContext<'a> {
    pub theme: &'a Theme,
    pub page_count: usize,
    /// Number of the page being composed, 1-based.
    pub page_number: usize,
    pub page_width: f64,
    pub page_height: f64,
    pub padding: Edges,
    pub toc: &'a [TocEntry],
}

/// A function bound to an element, run at compose time.
pub type ElementTemplate = fn(&ComposeContext, &mut Element);

/// Wrapper that gives bound templates a readable `Debug`.
#[derive(Clone, Copy)]
pub struct BoundTemplate(pub ElementTemplate);

impl fmt::Debug for BoundTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BoundTemplate")
    }
}

/// The size a parent passes down to its children during build.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Rect,
    Oval,
    /// From the origin to origin + (w, h).
    Line,
    /// Unboxed text; the origin is the first baseline.
    Text(BabelString),
    TextBox(TextBox),
    Image(Image),
    Marker(Marker),
    Page { number: usize },
}

impl ElementKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementKind::Rect => "Rect",
            ElementKind::Oval => "Oval",
            ElementKind::Line => "Line",
            ElementKind::Text(_) => "Text",
            ElementKind::TextBox(_) => "TextBox",
            ElementKind::Image(_) => "Image",
            ElementKind::Marker(_) => "Marker",
            ElementKind::Page { .. } => "Page",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Used for slot lookup. Defaults to the kind name.
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub w: Option<f64>,
    pub h: Option<f64>,
    pub padding: Edges,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub template: Option<BoundTemplate>,
    pub kind: ElementKind,
    children: Vec<Element>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            name: kind.kind_name().to_string(),
            x: 0.0,
            y: 0.0,
            w: None,
            h: None,
            padding: Edges::default(),
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            template: None,
            kind,
            children: Vec::new(),
        }
    }

    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(ElementKind::Rect).at(x, y).size(w, h)
    }

    pub fn oval(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(ElementKind::Oval).at(x, y).size(w, h)
    }

    /// A black 1pt line from `(x, y)` to `(x + w, y + h)`.
    pub fn line(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(ElementKind::Line)
            .at(x, y)
            .size(w, h)
            .with_stroke(Color::BLACK, 1.0)
    }

    pub fn text(bs: BabelString, x: f64, y: f64) -> Self {
        Self::new(ElementKind::Text(bs)).at(x, y)
    }

    /// A text box. The width is required to flow text; the height may be
    /// left to measurement.
    pub fn text_box(bs: BabelString, w: Option<f64>, h: Option<f64>) -> Result<Self, QuireError> {
        let w = w.ok_or_else(|| QuireError::MissingWidth {
            name: "TextBox".to_string(),
        })?;
        let mut element = TextBox::element(bs, w);
        element.h = h;
        Ok(element)
    }

    pub fn image(image: Image) -> Self {
        Self::new(ElementKind::Image(image))
    }

    pub fn marker(marker: Marker) -> Self {
        Self::new(ElementKind::Marker(marker))
    }

    pub fn page(number: usize, w: f64, h: f64) -> Self {
        Self::new(ElementKind::Page { number }).size(w, h)
    }

    // ── Builders ───────────────────────────────────────────────

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn size(mut self, w: f64, h: f64) -> Self {
        self.w = Some(w);
        self.h = Some(h);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke = Some(color);
        self.stroke_width = width;
        self
    }

    pub fn with_padding(mut self, padding: Edges) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_template(mut self, template: ElementTemplate) -> Self {
        self.template = Some(BoundTemplate(template));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    // ── Tree ───────────────────────────────────────────────────

    /// Append a child and return its index.
    pub fn add_element(&mut self, child: Element) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// Depth-first search by name, this element first.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    pub fn as_text_box(&self) -> Option<&TextBox> {
        match &self.kind {
            ElementKind::TextBox(tb) => Some(tb),
            _ => None,
        }
    }

    pub fn as_text_box_mut(&mut self) -> Option<&mut TextBox> {
        match &mut self.kind {
            ElementKind::TextBox(tb) => Some(tb),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&Marker> {
        match &self.kind {
            ElementKind::Marker(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_template_marker(&self) -> bool {
        self.as_marker().is_some_and(|m| m.is_template())
    }

    pub fn page_number(&self) -> Option<usize> {
        match self.kind {
            ElementKind::Page { number } => Some(number),
            _ => None,
        }
    }

    // ── Geometry ───────────────────────────────────────────────

    pub fn pl(&self) -> f64 {
        self.padding.left
    }

    pub fn pr(&self) -> f64 {
        self.padding.right
    }

    pub fn pt(&self) -> f64 {
        self.padding.top
    }

    pub fn pb(&self) -> f64 {
        self.padding.bottom
    }

    /// Width inside the padding.
    pub fn pw(&self) -> Option<f64> {
        self.w.map(|w| w - self.pl() - self.pr())
    }

    /// Height inside the padding.
    pub fn ph(&self) -> Option<f64> {
        self.h.map(|h| h - self.pt() - self.pb())
    }

    fn drawable_size(&self) -> Option<(f64, f64)> {
        match (self.w, self.h) {
            (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Some((w, h)),
            _ => None,
        }
    }

    // ── Compose ────────────────────────────────────────────────

    /// Run the bound template, then compose every child, including the ones
    /// the template just added.
    pub fn compose(&mut self, ctx: &ComposeContext) {
        if let Some(BoundTemplate(template)) = self.template {
            template(ctx, self);
        }
        for child in &mut self.children {
            child.compose(ctx);
        }
    }

    // ── Build ──────────────────────────────────────────────────

    /// Draw this element and its subtree. `(ox, oy)` is the parent's absolute
    /// origin.
    pub fn build(&mut self, ox: f64, oy: f64, canvas: &mut dyn Canvas, parent: Frame) -> Result<(), QuireError> {
        let origin = Point::new(ox + self.x, oy + self.y);
        let frame = Frame {
            w: self.w.unwrap_or(parent.w),
            h: self.h.unwrap_or(parent.h),
        };

        self.draw_background(origin, canvas);
        self.draw_content(origin, canvas)?;
        for child in &mut self.children {
            child.build(origin.x, origin.y, canvas, frame)?;
        }
        self.draw_foreground(origin, canvas);
        Ok(())
    }

    fn draw_background(&self, p: Point, canvas: &mut dyn Canvas) {
        let (Some(fill), Some((w, h))) = (self.fill, self.drawable_size()) else {
            return;
        };
        match self.kind {
            ElementKind::Line | ElementKind::Marker(_) => {}
            ElementKind::Oval => {
                canvas.fill(Some(fill));
                canvas.stroke(None, 0.0);
                canvas.oval(p.x, p.y, w, h);
            }
            _ => {
                canvas.fill(Some(fill));
                canvas.stroke(None, 0.0);
                canvas.rect(p.x, p.y, w, h);
            }
        }
    }

    fn draw_content(&mut self, p: Point, canvas: &mut dyn Canvas) -> Result<(), QuireError> {
        let (w, h) = (self.w, self.h);
        let padding = self.padding;
        match &mut self.kind {
            ElementKind::Text(bs) => {
                canvas.text(bs.rich_text(), p);
            }
            ElementKind::TextBox(tb) => tb.draw(p, w, h, &padding, canvas),
            ElementKind::Image(image) => image.draw(p, w, h, canvas)?,
            _ => {}
        }
        Ok(())
    }

    fn draw_foreground(&self, p: Point, canvas: &mut dyn Canvas) {
        let Some(stroke) = self.stroke.filter(|_| self.stroke_width > 0.0) else {
            return;
        };
        match self.kind {
            ElementKind::Marker(_) => {}
            ElementKind::Line => {
                let (Some(w), Some(h)) = (self.w, self.h) else {
                    return;
                };
                canvas.stroke(Some(stroke), self.stroke_width);
                canvas.line(p, Point::new(p.x + w, p.y + h));
            }
            ElementKind::Oval => {
                if let Some((w, h)) = self.drawable_size() {
                    canvas.fill(None);
                    canvas.stroke(Some(stroke), self.stroke_width);
                    canvas.oval(p.x, p.y, w, h);
                }
            }
            _ => {
                if let Some((w, h)) = self.drawable_size() {
                    canvas.fill(None);
                    canvas.stroke(Some(stroke), self.stroke_width);
                    canvas.rect(p.x, p.y, w, h);
                }
            }
        }
    }

    /// What would not fit if this text box were filled with `candidate`
    /// (or its own text) in a `w` by `h` box. Missing dimensions come from
    /// the element, then from measurement. `None` for other kinds.
    pub fn get_overflow(
        &self,
        candidate: Option<&BabelString>,
        w: Option<f64>,
        h: Option<f64>,
        canvas: &mut dyn Canvas,
    ) -> Option<BabelString> {
        let tb = self.as_text_box()?;
        let bs = candidate.unwrap_or(&tb.bs);
        let (w, h) = self.flow_size(bs, w.or(self.pw()), h.or(self.ph()), canvas);
        let rest = canvas.fit_text(bs.rich_text(), w, h);
        Some(BabelString::from_rich_text(&rest))
    }

    /// Resolve a box size for `bs`, measuring whichever side is missing.
    pub(crate) fn flow_size(
        &self,
        bs: &BabelString,
        w: Option<f64>,
        h: Option<f64>,
        canvas: &mut dyn Canvas,
    ) -> (f64, f64) {
        match (w, h) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, bs.text_size(canvas, Some(w), None).1),
            (None, Some(h)) => (bs.text_size(canvas, None, Some(h)).0, h),
            (None, None) => bs.text_size(canvas, None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::display::{DisplayCanvas, DrawOp};
    use crate::style::Style;

    fn page_frame() -> Frame {
        Frame { w: 500.0, h: 500.0 }
    }

    #[test]
    fn test_default_name_is_kind() {
        assert_eq!(Element::rect(0.0, 0.0, 1.0, 1.0).name, "Rect");
        assert_eq!(Element::page(1, 10.0, 10.0).name, "Page");
        assert_eq!(Element::rect(0.0, 0.0, 1.0, 1.0).named("logo").name, "logo");
    }

    #[test]
    fn test_text_box_requires_width() {
        let err = Element::text_box(BabelString::from("x"), None, Some(10.0)).unwrap_err();
        assert!(matches!(err, QuireError::MissingWidth { ref name } if name == "TextBox"));
        assert!(Element::text_box(BabelString::from("x"), Some(10.0), None).is_ok());
    }

    #[test]
    fn test_origin_is_additive() {
        let mut tree = Element::rect(10.0, 20.0, 100.0, 100.0).with_child(
            Element::rect(5.0, 7.0, 50.0, 50.0)
                .with_child(Element::rect(1.0, 2.0, 10.0, 10.0).with_fill(Color::WHITE)),
        );
        let mut canvas = DisplayCanvas::new();
        tree.build(100.0, 200.0, &mut canvas, page_frame()).unwrap();
        let ops = &canvas.pages()[0].ops;
        assert_eq!(ops.len(), 1);
        let DrawOp::Rect { x, y, .. } = ops[0] else {
            panic!("expected a rect");
        };
        assert_eq!((x, y), (116.0, 229.0));
    }

    #[test]
    fn test_phase_order() {
        let mut tree = Element::rect(0.0, 0.0, 10.0, 10.0)
            .with_fill(Color::WHITE)
            .with_stroke(Color::BLACK, 1.0)
            .with_child(Element::oval(1.0, 1.0, 2.0, 2.0).with_fill(Color::BLACK));
        let mut canvas = DisplayCanvas::new();
        tree.build(0.0, 0.0, &mut canvas, page_frame()).unwrap();
        let ops = &canvas.pages()[0].ops;
        assert!(matches!(ops[0], DrawOp::Rect { fill: Some(_), stroke: None, .. }));
        assert!(matches!(ops[1], DrawOp::Oval { .. }));
        assert!(matches!(ops[2], DrawOp::Rect { fill: None, stroke: Some(_), .. }));
    }

    #[test]
    fn test_undefined_or_negative_size_skips_drawing() {
        let mut canvas = DisplayCanvas::new();
        let mut no_size = Element::new(ElementKind::Rect).with_fill(Color::WHITE);
        no_size.build(0.0, 0.0, &mut canvas, page_frame()).unwrap();
        let mut negative = Element::rect(0.0, 0.0, -5.0, 5.0).with_fill(Color::WHITE);
        negative.build(0.0, 0.0, &mut canvas, page_frame()).unwrap();
        assert!(canvas.pages().is_empty());
    }

    #[test]
    fn test_line_runs_from_origin() {
        let mut line = Element::line(10.0, 10.0, 30.0, -5.0);
        let mut canvas = DisplayCanvas::new();
        line.build(0.0, 0.0, &mut canvas, page_frame()).unwrap();
        let DrawOp::Line { from, to, .. } = canvas.pages()[0].ops[0] else {
            panic!("expected a line");
        };
        assert_eq!(from, Point::new(10.0, 10.0));
        assert_eq!(to, Point::new(40.0, 5.0));
    }

    #[test]
    fn test_find_depth_first() {
        let mut page = Element::page(1, 100.0, 100.0)
            .with_child(Element::rect(0.0, 0.0, 1.0, 1.0).with_child(Element::oval(0.0, 0.0, 1.0, 1.0).named("target")))
            .with_child(Element::rect(0.0, 0.0, 1.0, 1.0).named("target"));
        assert_eq!(page.find("target").map(|e| e.kind.kind_name()), Some("Oval"));
        assert!(page.find("missing").is_none());
        page.find_mut("target").unwrap().x = 9.0;
        assert_eq!(page.children()[0].children()[0].x, 9.0);
    }

    fn stamp(ctx: &ComposeContext, element: &mut Element) {
        element.add_element(
            Element::text(BabelString::new(ctx.page_number.to_string(), Some(Style::tagged("p"))), 0.0, 0.0)
                .named("stamp"),
        );
    }

    #[test]
    fn test_compose_runs_bound_template() {
        let theme = crate::theme::presets::default_theme();
        let ctx = ComposeContext {
            theme: &theme,
            page_count: 3,
            page_number: 2,
            page_width: 100.0,
            page_height: 100.0,
            padding: Edges::default(),
            toc: &[],
        };
        let mut page = Element::page(2, 100.0, 100.0).with_child(Element::rect(0.0, 0.0, 1.0, 1.0).with_template(stamp));
        page.compose(&ctx);
        let stamp = page.find("stamp").unwrap();
        match &stamp.kind {
            ElementKind::Text(bs) => assert_eq!(bs.text(), "2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_get_overflow_measures_missing_height() {
        let mut canvas = DisplayCanvas::new();
        let style = Style {
            font_size: Some(10.0),
            line_height: Some(20.0),
            ..Default::default()
        };
        let element = Element::text_box(BabelString::new("aaa bbb ccc", Some(style)), Some(30.0), None).unwrap();
        let rest = element.get_overflow(None, None, None, &mut canvas).unwrap();
        assert_eq!(rest.rendered_len(), 0);
        let rest = element.get_overflow(None, None, Some(45.0), &mut canvas).unwrap();
        assert_eq!(rest.text(), "ccc");
        assert!(rest.is_incomplete());
        assert!(Element::rect(0.0, 0.0, 1.0, 1.0)
            .get_overflow(None, None, None, &mut canvas)
            .is_none());
    }
}
