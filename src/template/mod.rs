//! # Templates
//!
//! A galley is a flat list of elements. Template markers in it split the
//! list into runs, and each run is handed to the template the marker names.
//! Content before the first marker goes to the default template.
//!
//! Templates are plain functions over the document. They read the run from
//! [`ComposerData::elements`] and place it on pages, usually through
//! [`crate::layout::flow`].

pub mod one_column;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::document::Document;
use crate::element::Element;
use crate::error::{Diagnostics, QuireError};
use crate::theme::Theme;
use crate::typesetter::Galley;

/// A document-level template.
pub type TemplateFn = fn(&Theme, &mut Document) -> Result<(), QuireError>;

/// Named templates plus the one used for content before any marker and for
/// unknown names.
#[derive(Clone)]
pub struct TemplateSet {
    templates: BTreeMap<String, TemplateFn>,
    default: String,
}

impl TemplateSet {
    pub fn new(default: &str) -> Self {
        Self {
            templates: BTreeMap::new(),
            default: default.to_string(),
        }
    }

    pub fn register(&mut self, name: &str, template: TemplateFn) -> &mut Self {
        self.templates.insert(name.to_string(), template);
        self
    }

    pub fn get(&self, name: &str) -> Option<TemplateFn> {
        self.templates.get(name).copied()
    }

    pub fn set_default(&mut self, name: &str) {
        self.default = name.to_string();
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

/// One table-of-contents line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub page: usize,
}

/// Shared state of the templates while a galley is being composed.
#[derive(Debug, Default)]
pub struct ComposerData {
    /// Page the templates are currently writing to.
    pub page: Option<usize>,
    /// Index into the galley of the element being dispatched.
    pub cursor: usize,
    /// Template the current run belongs to.
    pub template: Option<String>,
    /// The run handed to the current template.
    pub elements: Vec<Element>,
    pub diagnostics: Diagnostics,
    /// Detail messages, kept out of the warnings.
    pub verbose: Vec<String>,
    pub toc: Vec<TocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Accumulating(String),
}

/// Split `galley` at template markers and call each template with its run.
///
/// A marker always flushes the run before it, even an empty one, so a
/// marker with no content still gets its template called.
pub fn compose_galley(doc: &mut Document, galley: Galley) -> Result<(), QuireError> {
    let theme = Arc::clone(doc.theme());
    let mut state = DispatchState::Idle;
    let mut run = Vec::new();

    for (cursor, element) in galley.elements.into_iter().enumerate() {
        doc.composer.cursor = cursor;
        if element.is_template_marker() {
            if let DispatchState::Accumulating(name) = &state {
                flush(doc, &theme, name, std::mem::take(&mut run))?;
            }
            let kind = element.as_marker().map(|m| m.kind.clone()).unwrap_or_default();
            state = DispatchState::Accumulating(kind);
            continue;
        }
        if state == DispatchState::Idle {
            state = DispatchState::Accumulating(doc.templates().default_name().to_string());
        }
        run.push(element);
    }

    if let DispatchState::Accumulating(name) = state {
        flush(doc, &theme, &name, run)?;
    }
    Ok(())
}

fn flush(doc: &mut Document, theme: &Theme, name: &str, elements: Vec<Element>) -> Result<(), QuireError> {
    let template = match doc.templates().get(name) {
        Some(t) => t,
        None => {
            let fallback = doc.templates().default_name().to_string();
            doc.composer
                .diagnostics
                .warn(format!("Unknown template \"{}\", using \"{}\"", name, fallback));
            match doc.templates().get(&fallback) {
                Some(t) => t,
                None => {
                    return Err(QuireError::Config(format!(
                        "default template \"{}\" is not registered",
                        fallback
                    )))
                }
            }
        }
    };
    log::debug!("Template \"{}\" gets {} elements", name, elements.len());
    doc.composer.template = Some(name.to_string());
    doc.composer.elements = elements;
    let result = template(theme, doc);
    doc.composer.elements.clear();
    result
}
