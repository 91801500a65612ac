//! Text flowed into a box, keeping whatever did not fit.

use super::{Element, ElementKind};
use crate::canvas::{Canvas, Point};
use crate::config::Edges;
use crate::text::BabelString;

#[derive(Debug, Clone, Default)]
pub struct TextBox {
    pub bs: BabelString,
    /// Text left over after the last build. `None` until built.
    pub overflow: Option<BabelString>,
}

impl TextBox {
    pub fn new(bs: BabelString) -> Self {
        Self { bs, overflow: None }
    }

    /// A text box element of width `w` and measured height.
    pub fn element(bs: BabelString, w: f64) -> Element {
        let mut element = Element::new(ElementKind::TextBox(TextBox::new(bs)));
        element.w = Some(w);
        element
    }

    /// Flow the text into the padded box at `p` and keep the remainder.
    /// A missing height is measured from the width; a box without width or
    /// with no area draws nothing.
    pub(super) fn draw(&mut self, p: Point, w: Option<f64>, h: Option<f64>, padding: &Edges, canvas: &mut dyn Canvas) {
        let Some(w) = w else {
            return;
        };
        let inner_w = w - padding.left - padding.right;
        let inner_h = match h {
            Some(h) => h - padding.top - padding.bottom,
            None => self.bs.text_size(canvas, Some(inner_w), None).1,
        };
        if inner_w <= 0.0 || inner_h <= 0.0 {
            return;
        }
        let rest = canvas.text_box(
            self.bs.rich_text(),
            p.x + padding.left,
            p.y + padding.bottom,
            inner_w,
            inner_h,
        );
        self.overflow = Some(BabelString::from_rich_text(&rest));
    }
}
