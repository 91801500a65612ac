//! # Typesetter
//!
//! Turns a markup tree into a [`Galley`]: text runs collected into text
//! boxes as wide as the content area, with images and markers in between.
//!
//! Every tag maps to a [`Handler`]. The open side runs before the node's
//! children and appends the node's own text with the tag's style; the close
//! side runs after them. The node's tail follows the close side and is
//! written in the parent's style.
//!
//! Nothing here fails. Content the typesetter cannot use is reported in
//! [`Diagnostics`] and skipped.

pub mod galley;
pub mod node;

pub use galley::Galley;
pub use node::MarkupNode;

use crate::element::{Element, Image, Marker, TextBox};
use crate::error::Diagnostics;
use crate::style::Style;
use crate::text::BabelString;
use crate::theme::Theme;

/// What a tag does to the galley.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Traverse children; own text is not written.
    Container,
    /// Styled text closed by a paragraph return.
    Block,
    /// Styled text inside the current paragraph.
    Inline,
    Break,
    Rule,
    Image,
    Reference,
    Template,
    Skip,
    Unsupported,
}

impl Handler {
    pub fn for_tag(tag: &str) -> Self {
        match tag {
            "document" | "xml" | "body" | "html" | "div" | "ul" | "ol" => Handler::Container,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "blockquote" => Handler::Block,
            "em" | "i" | "b" | "strong" | "a" | "code" | "span" | "sup" | "sub" => Handler::Inline,
            "br" => Handler::Break,
            "hr" => Handler::Rule,
            "img" => Handler::Image,
            "footnote" | "literature" | "author" => Handler::Reference,
            "page" | "chapter" | "template" => Handler::Template,
            "python" => Handler::Skip,
            _ => Handler::Unsupported,
        }
    }
}

pub struct Typesetter<'a> {
    theme: &'a Theme,
    galley: Galley,
    hyphenation: bool,
    diagnostics: Diagnostics,
}

impl<'a> Typesetter<'a> {
    pub fn new(theme: &'a Theme, width: f64, hyphenation: bool) -> Self {
        Self {
            theme,
            galley: Galley::new(Vec::new(), width),
            hyphenation,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Typeset `root` and everything under it onto the end of the galley.
    pub fn typeset(&mut self, root: &MarkupNode) {
        self.node(root, None);
    }

    pub fn finish(self) -> (Galley, Diagnostics) {
        (self.galley, self.diagnostics)
    }

    fn node(&mut self, node: &MarkupNode, parent: Option<&Style>) {
        let handler = Handler::for_tag(&node.tag);
        let own = self.open(handler, node, parent);
        if handler != Handler::Skip {
            let inherited = own.as_ref().or(parent);
            for child in &node.children {
                self.node(child, inherited);
            }
        }
        self.close(handler, own.as_ref());
        if let Some(tail) = kept(node.tail.as_deref()) {
            self.append(tail, parent);
        }
    }

    /// Run the open side. Returns the style the node's children inherit
    /// when the tag sets one.
    fn open(&mut self, handler: Handler, node: &MarkupNode, parent: Option<&Style>) -> Option<Style> {
        let text = kept(node.text.as_deref());
        match handler {
            Handler::Container | Handler::Skip => None,
            Handler::Block | Handler::Inline => {
                let style = self.tag_style(&node.tag, parent);
                if let Some(text) = text {
                    self.append(text, Some(&style));
                }
                Some(style)
            }
            Handler::Break => {
                self.append("\n", None);
                None
            }
            Handler::Rule => {
                let style = self.tag_style(&node.tag, parent);
                self.paragraph_return(&style);
                None
            }
            Handler::Image => {
                self.image(node);
                None
            }
            Handler::Reference => {
                let reference = ["id", "ref", "index"]
                    .iter()
                    .find_map(|key| node.attribute(key))
                    .map(str::to_string);
                self.galley
                    .elements
                    .push(Element::marker(Marker::reference(&node.tag, reference)));
                None
            }
            Handler::Template => {
                let kind = match node.tag.as_str() {
                    "template" => node.attribute("name").unwrap_or("template"),
                    tag => tag,
                };
                self.galley.elements.push(Element::marker(Marker::template(kind)));
                None
            }
            Handler::Unsupported => {
                self.diagnostics
                    .warn(format!("Unsupported tag <{}>, its text is dropped", node.tag));
                None
            }
        }
    }

    fn close(&mut self, handler: Handler, own: Option<&Style>) {
        if let (Handler::Block, Some(style)) = (handler, own) {
            self.paragraph_return(style);
        }
    }

    fn image(&mut self, node: &MarkupNode) {
        let Some(src) = node.attribute("src") else {
            self.diagnostics.warn("Image without src is skipped");
            return;
        };
        match Image::new(src) {
            Ok(image) => self.galley.elements.push(Element::image(image).named("img")),
            Err(e) => self.diagnostics.warn(format!("{}, skipped", e)),
        }
    }

    /// The theme's style for `tag`, cascaded over the parent style.
    fn tag_style(&mut self, tag: &str, parent: Option<&Style>) -> Style {
        let own = match self.theme.style(tag) {
            Some(style) => style.with_tag(tag),
            None => {
                self.diagnostics
                    .warn(format!("Theme \"{}\" has no style for <{}>", self.theme.name(), tag));
                Style::tagged(tag)
            }
        };
        match parent {
            Some(parent) => parent.merge(&own),
            None => own,
        }
    }

    fn paragraph_return(&mut self, style: &Style) {
        let ends_with_newline = self
            .current_text()
            .is_some_and(|bs| bs.text().ends_with('\n'));
        if !ends_with_newline {
            self.append("\n", Some(style));
        }
    }

    fn current_text(&self) -> Option<&BabelString> {
        self.galley.elements.last()?.as_text_box().map(|tb| &tb.bs)
    }

    /// Append to the current text box, opening one when the galley does
    /// not end in a text box. A style equal to the last run's extends that
    /// run.
    fn append(&mut self, text: &str, style: Option<&Style>) {
        let width = self.galley.width;
        let hyphenation = self.hyphenation;
        let needs_box = self
            .galley
            .elements
            .last()
            .map_or(true, |e| e.as_text_box().is_none());
        if needs_box {
            let mut bs = BabelString::new(text, style.cloned());
            bs.set_hyphenation(hyphenation);
            self.galley.elements.push(TextBox::element(bs, width));
            return;
        }
        if let Some(tb) = self.galley.elements.last_mut().and_then(Element::as_text_box_mut) {
            let style = style.filter(|s| tb.bs.last_style() != Some(*s));
            tb.bs.append(text, style.cloned());
        }
    }
}

/// Whitespace that spans lines is source formatting, not content.
fn kept(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty() && !(t.trim().is_empty() && t.contains('\n')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementKind;
    use crate::theme::presets;

    fn typeset(root: &MarkupNode) -> (Galley, Diagnostics) {
        let theme = presets::default_theme();
        let mut ts = Typesetter::new(&theme, 300.0, false);
        ts.typeset(root);
        ts.finish()
    }

    #[test]
    fn test_handler_table() {
        assert_eq!(Handler::for_tag("div"), Handler::Container);
        assert_eq!(Handler::for_tag("h3"), Handler::Block);
        assert_eq!(Handler::for_tag("strong"), Handler::Inline);
        assert_eq!(Handler::for_tag("chapter"), Handler::Template);
        assert_eq!(Handler::for_tag("blink"), Handler::Unsupported);
    }

    #[test]
    fn test_block_text_and_tail() {
        let root = MarkupNode::new("body").with_child(
            MarkupNode::new("p")
                .with_text("Hello ")
                .with_child(MarkupNode::new("em").with_text("big").with_tail(" world")),
        );
        let (galley, diagnostics) = typeset(&root);
        assert!(diagnostics.is_empty());
        assert_eq!(galley.len(), 1);
        assert_eq!(galley.text(), "Hello big world\n");
        let tb = galley.elements[0].as_text_box().unwrap();
        let tags: Vec<_> = tb.bs.runs().iter().map(|r| r.style().tag.clone()).collect();
        assert_eq!(
            tags,
            vec![Some("p".to_string()), Some("em".to_string()), Some("p".to_string())]
        );
        assert_eq!(galley.elements[0].w, Some(300.0));
    }

    #[test]
    fn test_markers_split_text_boxes() {
        let root = MarkupNode::new("document")
            .with_child(MarkupNode::new("p").with_text("one"))
            .with_child(MarkupNode::new("chapter"))
            .with_child(MarkupNode::new("template").with_attribute("name", "cover"))
            .with_child(MarkupNode::new("footnote").with_attribute("ref", "n1"))
            .with_child(MarkupNode::new("p").with_text("two"));
        let (galley, _) = typeset(&root);
        let kinds: Vec<_> = galley.elements.iter().map(|e| e.kind.kind_name()).collect();
        assert_eq!(kinds, vec!["TextBox", "Marker", "Marker", "Marker", "TextBox"]);
        assert_eq!(galley.elements[1].as_marker().map(|m| m.kind.as_str()), Some("chapter"));
        assert_eq!(galley.elements[2].as_marker().map(|m| m.kind.as_str()), Some("cover"));
        let footnote = galley.elements[3].as_marker().unwrap();
        assert!(!footnote.is_template());
        assert_eq!(footnote.reference.as_deref(), Some("n1"));
    }

    #[test]
    fn test_unknown_tag_keeps_children() {
        let root = MarkupNode::new("body").with_child(
            MarkupNode::new("blink")
                .with_text("lost")
                .with_child(MarkupNode::new("p").with_text("kept"))
                .with_child(MarkupNode::new("p").with_text("also")),
        );
        let (galley, diagnostics) = typeset(&root);
        assert_eq!(galley.text(), "kept\nalso\n");
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_missing_style_is_tagged() {
        let theme = presets::default_theme().without_style("blockquote");
        let mut ts = Typesetter::new(&theme, 300.0, false);
        ts.typeset(&MarkupNode::new("blockquote").with_text("q"));
        let (galley, diagnostics) = ts.finish();
        assert_eq!(diagnostics.warnings().len(), 1);
        let tb = galley.elements[0].as_text_box().unwrap();
        assert_eq!(tb.bs.runs()[0].style().tag.as_deref(), Some("blockquote"));
    }

    #[test]
    fn test_python_is_skipped_but_tail_kept() {
        let root = MarkupNode::new("p").with_child(
            MarkupNode::new("python")
                .with_text("print(1)")
                .with_tail("after"),
        );
        let (galley, _) = typeset(&root);
        assert_eq!(galley.text(), "after\n");
    }

    #[test]
    fn test_missing_image_warns() {
        let root = MarkupNode::new("img").with_attribute("src", "/nonexistent/quire.png");
        let (galley, diagnostics) = typeset(&root);
        assert!(galley.is_empty());
        assert_eq!(diagnostics.warnings().len(), 1);
    }

    #[test]
    fn test_source_whitespace_is_dropped() {
        let root = MarkupNode::new("body")
            .with_text("\n  ")
            .with_child(MarkupNode::new("p").with_text("a").with_tail("\n  "))
            .with_child(MarkupNode::new("br").with_tail("b"));
        let (galley, _) = typeset(&root);
        assert_eq!(galley.text(), "a\n\nb");
        assert!(matches!(galley.elements[0].kind, ElementKind::TextBox(_)));
    }

    #[test]
    fn test_hr_is_a_paragraph_return() {
        let root = MarkupNode::new("body")
            .with_child(MarkupNode::new("span").with_text("x"))
            .with_child(MarkupNode::new("hr"))
            .with_child(MarkupNode::new("hr"));
        let (galley, _) = typeset(&root);
        assert_eq!(galley.text(), "x\n");
    }
}
