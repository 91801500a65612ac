//! Render-ready rich text: what a [`Canvas`](crate::canvas::Canvas) consumes
//! and what it hands back as overflow.

use crate::style::TextAttributes;

/// A stretch of text with fully resolved attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RichSpan {
    pub text: String,
    pub attrs: TextAttributes,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichText {
    pub spans: Vec<RichSpan>,
    /// Hyphenate when flowing into a box.
    pub hyphenation: bool,
    pub language: Option<String>,
}

impl RichText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text. Empty text is dropped; text with the same attributes as
    /// the last span joins it.
    pub fn push(&mut self, text: &str, attrs: &TextAttributes) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.attrs == *attrs => last.text.push_str(text),
            _ => self.spans.push(RichSpan {
                text: text.to_string(),
                attrs: attrs.clone(),
            }),
        }
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Each character paired with the index of its span.
    pub fn styled_chars(&self) -> Vec<(char, usize)> {
        self.spans
            .iter()
            .enumerate()
            .flat_map(|(i, s)| s.text.chars().map(move |ch| (ch, i)))
            .collect()
    }

    /// The text from character `start` to the end, attributes kept.
    pub fn slice_from(&self, start: usize) -> RichText {
        let mut out = RichText {
            spans: Vec::new(),
            hyphenation: self.hyphenation,
            language: self.language.clone(),
        };
        let mut skipped = 0;
        for span in &self.spans {
            let count = span.text.chars().count();
            if skipped + count <= start {
                skipped += count;
                continue;
            }
            let offset = start.saturating_sub(skipped);
            let text: String = span.text.chars().skip(offset).collect();
            out.push(&text, &span.attrs);
            skipped += count;
        }
        out
    }
}
