use crate::element::{Element, ElementKind};

/// The typesetter's output: one flat column of elements, before any of it
/// is split into pages.
#[derive(Debug, Clone, Default)]
pub struct Galley {
    pub elements: Vec<Element>,
    /// Width new text boxes are created with.
    pub width: f64,
}

impl Galley {
    pub fn new(elements: Vec<Element>, width: f64) -> Self {
        Self { elements, width }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Concatenated text of every text box, for inspection.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match &e.kind {
                ElementKind::TextBox(tb) => Some(tb.bs.text()),
                _ => None,
            })
            .collect()
    }
}
