//! # Rich Text
//!
//! [`BabelString`] is the rich-text value that moves through the engine: an
//! ordered, never-empty list of [`BabelRun`]s, each pairing literal text with
//! a [`Style`].
//!
//! Three projections are derived lazily and cached together:
//!
//! - [`BabelString::rich_text`]: the render-ready [`RichText`] a canvas draws;
//! - [`BabelString::markup`]: a flattened tag string, one element per run;
//! - [`BabelString::style_sheet`]: styles merged per tag.
//!
//! Every mutation drops all three, along with cached text sizes.

pub mod lines;
pub mod rich;

use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, HashMap};

use crate::canvas::Canvas;
use crate::style::Style;

pub use rich::{RichSpan, RichText};

/// Merged styles keyed by tag.
pub type StyleSheet = BTreeMap<String, Style>;

/// Tag used in the markup projection for runs without one.
pub const DEFAULT_TAG: &str = "span";

/// Literal text paired with a style.
#[derive(Debug, Clone, PartialEq)]
pub struct BabelRun {
    text: String,
    style: Style,
}

impl BabelRun {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &Style {
        &self.style
    }
}

type SizeKey = (Option<u64>, Option<u64>);

#[derive(Debug, Clone, Default)]
struct Projections {
    rich: OnceCell<RichText>,
    markup: OnceCell<String>,
    sheet: OnceCell<StyleSheet>,
    sizes: RefCell<HashMap<SizeKey, (f64, f64)>>,
}

#[derive(Debug, Clone)]
pub struct BabelString {
    runs: Vec<BabelRun>,
    hyphenation: bool,
    language: Option<String>,
    incomplete: bool,
    cache: Projections,
}

impl Default for BabelString {
    fn default() -> Self {
        Self::new("", None)
    }
}

impl PartialEq for BabelString {
    fn eq(&self, other: &Self) -> bool {
        self.runs == other.runs
            && self.hyphenation == other.hyphenation
            && self.language == other.language
            && self.incomplete == other.incomplete
    }
}

impl From<&str> for BabelString {
    fn from(text: &str) -> Self {
        Self::new(text, None)
    }
}

impl BabelString {
    pub fn new(text: impl Into<String>, style: Option<Style>) -> Self {
        Self {
            runs: vec![BabelRun::new(text, style.unwrap_or_default())],
            hyphenation: false,
            language: None,
            incomplete: false,
            cache: Projections::default(),
        }
    }

    /// Rebuild from a canvas's overflow. Styles are translated back from the
    /// resolved attributes, so tag and class name are lost and the result is
    /// marked incomplete.
    pub fn from_rich_text(rich: &RichText) -> Self {
        let mut runs: Vec<BabelRun> = rich
            .spans
            .iter()
            .map(|span| BabelRun::new(span.text.clone(), Style::from_attributes(&span.attrs)))
            .collect();
        if runs.is_empty() {
            runs.push(BabelRun::new("", Style::default()));
        }
        Self {
            runs,
            hyphenation: rich.hyphenation,
            language: rich.language.clone(),
            incomplete: true,
            cache: Projections::default(),
        }
    }

    /// Append text. Without a style the last run grows; with one, a new run
    /// starts, even when the style equals the last run's.
    pub fn append(&mut self, text: &str, style: Option<Style>) {
        match style {
            Some(style) => self.runs.push(BabelRun::new(text, style)),
            None => {
                if let Some(last) = self.runs.last_mut() {
                    last.text.push_str(text);
                }
            }
        }
        self.invalidate();
    }

    /// Copy all runs of `other` onto the end of this string.
    pub fn concat(&mut self, other: &BabelString) {
        self.runs.extend(other.runs.iter().cloned());
        self.incomplete |= other.incomplete;
        self.invalidate();
    }

    pub fn runs(&self) -> &[BabelRun] {
        &self.runs
    }

    /// Style of the last run; the one an unstyled append extends.
    pub fn last_style(&self) -> Option<&Style> {
        self.runs.last().map(|r| &r.style)
    }

    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn hyphenation(&self) -> bool {
        self.hyphenation
    }

    pub fn set_hyphenation(&mut self, on: bool) {
        self.hyphenation = on;
        self.invalidate();
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: Option<String>) {
        self.language = language;
        self.invalidate();
    }

    /// True for strings rebuilt from a canvas's overflow.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Characters the renderer would draw.
    pub fn rendered_len(&self) -> usize {
        self.rich_text().len()
    }

    pub fn rich_text(&self) -> &RichText {
        self.cache.rich.get_or_init(|| {
            let mut rich = RichText {
                spans: Vec::new(),
                hyphenation: self.hyphenation,
                language: self.language.clone(),
            };
            for run in &self.runs {
                let mut attrs = run.style.resolve(None);
                if run.style.hyphenation.is_none() {
                    attrs.hyphenation = self.hyphenation;
                }
                if attrs.language.is_none() {
                    attrs.language = self.language.clone();
                }
                rich.push(&run.text, &attrs);
            }
            rich
        })
    }

    /// Runs as `<tag class="name">text</tag>`. Trailing paragraph returns are
    /// dropped; runs left empty are skipped.
    pub fn markup(&self) -> &str {
        self.cache.markup.get_or_init(|| {
            let mut out = String::new();
            for run in &self.runs {
                let text = run.text.trim_end_matches('\n');
                if text.is_empty() {
                    continue;
                }
                let tag = run.style.tag.as_deref().unwrap_or(DEFAULT_TAG);
                match &run.style.name {
                    Some(class) => out.push_str(&format!("<{} class=\"{}\">", tag, escape(class))),
                    None => out.push_str(&format!("<{}>", tag)),
                }
                out.push_str(&escape(text));
                out.push_str(&format!("</{}>", tag));
            }
            out
        })
    }

    /// Styles merged per tag, in run order; later runs win per property.
    pub fn style_sheet(&self) -> &StyleSheet {
        self.cache.sheet.get_or_init(|| {
            let mut sheet = StyleSheet::new();
            for run in &self.runs {
                let tag = run.style.tag.clone().unwrap_or_else(|| DEFAULT_TAG.to_string());
                let merged = match sheet.get(&tag) {
                    Some(existing) => existing.merge(&run.style),
                    None => run.style.clone(),
                };
                sheet.insert(tag, merged);
            }
            sheet
        })
    }

    /// Size of the text measured by `canvas`, for an optional width or
    /// height constraint. Cached until the next mutation.
    pub fn text_size(&self, canvas: &mut dyn Canvas, w: Option<f64>, h: Option<f64>) -> (f64, f64) {
        let key = (w.map(f64::to_bits), h.map(f64::to_bits));
        if let Some(size) = self.cache.sizes.borrow().get(&key) {
            return *size;
        }
        let size = canvas.text_size(self.rich_text(), w, h);
        self.cache.sizes.borrow_mut().insert(key, size);
        size
    }

    fn invalidate(&mut self) {
        self.cache = Projections::default();
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::display::DisplayCanvas;
    use crate::style::Color;

    fn styled(tag: &str, size: f64) -> Style {
        Style {
            tag: Some(tag.to_string()),
            font_size: Some(size),
            ..Default::default()
        }
    }

    #[test]
    fn test_append_without_style_merges() {
        let mut bs = BabelString::new("Hello", Some(styled("p", 10.0)));
        bs.append(" world", None);
        assert_eq!(bs.runs().len(), 1);
        assert_eq!(bs.runs()[0].text(), "Hello world");
    }

    #[test]
    fn test_append_with_style_adds_run() {
        let mut bs = BabelString::new("Hello", Some(styled("p", 10.0)));
        bs.append(" world", Some(styled("p", 10.0)));
        assert_eq!(bs.runs().len(), 2);
        assert_eq!(bs.runs()[0].text(), "Hello");
        assert_eq!(bs.runs()[1].text(), " world");
    }

    #[test]
    fn test_concat_copies_runs() {
        let mut left = BabelString::new("a", Some(styled("p", 10.0)));
        let mut right = BabelString::new("b", Some(styled("em", 10.0)));
        right.append("c", Some(styled("b", 10.0)));
        left.concat(&right);
        assert_eq!(left.runs().len(), 3);
        assert_eq!(left.text(), "abc");
        assert_eq!(right.runs().len(), 2);
    }

    #[test]
    fn test_projections_refresh_after_mutation() {
        let mut bs = BabelString::new("one", Some(styled("p", 10.0)));
        assert_eq!(bs.markup(), "<p>one</p>");
        assert_eq!(bs.rendered_len(), 3);
        assert_eq!(bs.style_sheet().len(), 1);

        bs.append(" two", Some(styled("em", 10.0)));
        assert_eq!(bs.markup(), "<p>one</p><em> two</em>");
        assert_eq!(bs.rendered_len(), 7);
        assert_eq!(bs.style_sheet().len(), 2);
    }

    #[test]
    fn test_markup_defaults_and_classes() {
        let mut bs = BabelString::new("plain", None);
        bs.append(
            "a<b\n",
            Some(Style {
                name: Some("note".into()),
                tag: Some("p".into()),
                ..Default::default()
            }),
        );
        bs.append("\n", Some(Style::tagged("p")));
        assert_eq!(bs.markup(), "<span>plain</span><p class=\"note\">a&lt;b</p>");
    }

    #[test]
    fn test_style_sheet_last_write_wins() {
        let mut bs = BabelString::new(
            "a",
            Some(Style {
                tag: Some("p".into()),
                font_size: Some(10.0),
                fill: Some(Color::BLACK),
                ..Default::default()
            }),
        );
        bs.append("b", Some(styled("p", 14.0)));
        let p = &bs.style_sheet()["p"];
        assert_eq!(p.font_size, Some(14.0));
        assert_eq!(p.fill, Some(Color::BLACK));
    }

    #[test]
    fn test_rich_text_carries_flags() {
        let mut bs = BabelString::new("word", None);
        bs.set_hyphenation(true);
        bs.set_language(Some("en".into()));
        let rich = bs.rich_text();
        assert!(rich.hyphenation);
        assert!(rich.spans[0].attrs.hyphenation);
        assert_eq!(rich.spans[0].attrs.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_from_rich_text_is_incomplete() {
        let bs = BabelString::new("tail text", Some(styled("p", 9.0)));
        let back = BabelString::from_rich_text(bs.rich_text());
        assert!(back.is_incomplete());
        assert_eq!(back.text(), "tail text");
        assert_eq!(back.runs()[0].style().tag, None);
        assert_eq!(back.rich_text(), bs.rich_text());

        let empty = BabelString::from_rich_text(&RichText::new());
        assert_eq!(empty.runs().len(), 1);
        assert_eq!(empty.rendered_len(), 0);
    }

    #[test]
    fn test_text_size_cached_until_mutation() {
        let mut canvas = DisplayCanvas::new();
        let mut bs = BabelString::new("abcd", Some(styled("p", 10.0)));
        let (w, h) = bs.text_size(&mut canvas, None, None);
        assert!((w - 24.0).abs() < 1e-9);
        assert!((h - 14.0).abs() < 1e-9);
        assert_eq!(bs.text_size(&mut canvas, None, None), (w, h));

        bs.append("ef", None);
        let (w2, _) = bs.text_size(&mut canvas, None, None);
        assert!((w2 - 36.0).abs() < 1e-9);
    }
}
