//! Structured error types for the Quire composition engine.
//!
//! Two kinds of trouble are kept apart. Recoverable content problems (an
//! unknown tag, a style missing from the theme, an image that is not there)
//! are collected in [`Diagnostics`] and composition carries on. Everything
//! that makes the document impossible to compose is a [`QuireError`] and
//! aborts the current document.

use thiserror::Error;

/// The unified error type returned by all public Quire API functions.
#[derive(Error, Debug)]
pub enum QuireError {
    /// Configuration JSON failed to parse.
    #[error("Failed to parse configuration: {source}{}", format_hint(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// A configuration value is well-formed JSON but not usable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Markup node input is not well-formed XML.
    #[error("Malformed markup: {0}")]
    Xml(String),

    /// A TextBox was constructed without the width it needs to flow text.
    #[error("TextBox \"{name}\" needs a width")]
    MissingWidth { name: String },

    /// An Image was constructed from a path that does not exist.
    #[error("Image \"{path}\" does not exist")]
    ImageNotFound { path: String },

    /// The flow box has no usable area, so the text can never be placed.
    #[error("Flow \"{flow}\" cannot fit text into a {w} x {h} box")]
    DegenerateBox { flow: String, w: f64, h: f64 },

    /// A page of the flow accepted no text at all.
    #[error("Flow \"{flow}\" made no progress on page {page}")]
    NoProgress { flow: String, page: usize },

    /// The flow still had text left after the page cap was reached.
    #[error("Flow \"{flow}\" did not fit in {max_pages} pages")]
    PaginationOverflow { flow: String, max_pages: usize },

    /// A font could not be loaded or parsed.
    #[error("Font error: {0}")]
    Font(String),

    /// An image could not be read or decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// The canvas could not write its output.
    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for QuireError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => "Unexpected end of input. Is the JSON truncated?".to_string(),
            serde_json::error::Category::Io => String::new(),
        };
        QuireError::Parse { source: e, hint }
    }
}

impl From<quick_xml::Error> for QuireError {
    fn from(e: quick_xml::Error) -> Self {
        QuireError::Xml(e.to_string())
    }
}

/// Log of recoverable problems met while composing a document.
///
/// Every entry is mirrored to the `log` facade so a host application sees
/// them without polling.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.errors.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }

    /// Move all entries of `other` to the end of this log.
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }
}
