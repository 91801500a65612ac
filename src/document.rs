//! # Document
//!
//! The [`Document`] owns everything one composition run touches: the pages,
//! the shared theme, the template registry, the composer state and the
//! canvas. Pages are only ever appended, through [`Document::new_page`] or
//! [`Document::add_page`], and are numbered from 1 in creation order.
//!
//! A run goes typeset → compose galley → compose → build → export. Compose
//! finishes for every page before anything is drawn.

use std::path::Path;
use std::sync::Arc;

use crate::canvas::Canvas;
use crate::config::DocumentConfig;
use crate::element::{ComposeContext, Element, Frame};
use crate::error::QuireError;
use crate::template::{self, one_column::OneColumnTemplates, ComposerData, TemplateSet};
use crate::theme::Theme;
use crate::typesetter::{Galley, MarkupNode, Typesetter};

pub struct Document {
    config: DocumentConfig,
    theme: Arc<Theme>,
    templates: TemplateSet,
    pages: Vec<Element>,
    canvas: Box<dyn Canvas>,
    pub composer: ComposerData,
}

impl Document {
    pub fn new(config: DocumentConfig, theme: Arc<Theme>, templates: TemplateSet, mut canvas: Box<dyn Canvas>) -> Self {
        let (w, h) = config.dimensions();
        canvas.new_document(w, h);
        canvas.hyphenation(config.hyphenation);
        Self {
            config,
            theme,
            templates,
            pages: Vec::new(),
            canvas,
            composer: ComposerData::default(),
        }
    }

    /// A document with the configured theme and the one-column templates.
    pub fn from_config(config: DocumentConfig, canvas: Box<dyn Canvas>) -> Result<Self, QuireError> {
        let theme = Arc::new(config.theme.build()?);
        let mut templates = OneColumnTemplates::template_set();
        templates.set_default(&config.default_template);
        Ok(Self::new(config, theme, templates, canvas))
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateSet {
        &mut self.templates
    }

    /// Append a blank page of the document's size and padding. Returns its
    /// number.
    pub fn new_page(&mut self) -> usize {
        let (w, h) = self.config.dimensions();
        let number = self.pages.len() + 1;
        self.pages
            .push(Element::page(number, w, h).with_padding(self.config.padding));
        number
    }

    /// Append a page built elsewhere. It is renumbered, and a missing size
    /// is taken from the document.
    pub fn add_page(&mut self, mut page: Element) -> usize {
        let (w, h) = self.config.dimensions();
        let number = self.pages.len() + 1;
        page.kind = crate::element::ElementKind::Page { number };
        page.w = page.w.or(Some(w));
        page.h = page.h.or(Some(h));
        self.pages.push(page);
        number
    }

    pub fn pages(&self) -> &[Element] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, number: usize) -> Option<&Element> {
        number.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    pub fn page_mut(&mut self, number: usize) -> Option<&mut Element> {
        number.checked_sub(1).and_then(|i| self.pages.get_mut(i))
    }

    /// Drop every page after the first `count`.
    pub(crate) fn truncate_pages(&mut self, count: usize) {
        self.pages.truncate(count);
        if self.composer.page.is_some_and(|pn| pn > count) {
            self.composer.page = None;
        }
    }

    pub fn canvas_mut(&mut self) -> &mut dyn Canvas {
        self.canvas.as_mut()
    }

    /// A page and the canvas, borrowed together.
    pub(crate) fn page_and_canvas(&mut self, number: usize) -> Option<(&mut Element, &mut dyn Canvas)> {
        let page = number.checked_sub(1).and_then(|i| self.pages.get_mut(i))?;
        Some((page, self.canvas.as_mut()))
    }

    /// Typeset a markup tree into a galley as wide as the content area.
    /// Diagnostics go to the composer.
    pub fn typeset(&mut self, root: &MarkupNode) -> Galley {
        let mut typesetter = Typesetter::new(&self.theme, self.config.content_width(), self.config.hyphenation);
        typesetter.typeset(root);
        let (galley, diagnostics) = typesetter.finish();
        self.composer.diagnostics.extend(diagnostics);
        galley
    }

    /// Hand the galley to the templates.
    pub fn compose_galley(&mut self, galley: Galley) -> Result<(), QuireError> {
        template::compose_galley(self, galley)
    }

    /// Run element-bound templates on every page.
    pub fn compose(&mut self) {
        let (page_width, page_height) = self.config.dimensions();
        let page_count = self.pages.len();
        for page in &mut self.pages {
            let ctx = ComposeContext {
                theme: &self.theme,
                page_count,
                page_number: page.page_number().unwrap_or(0),
                page_width,
                page_height,
                padding: page.padding,
                toc: &self.composer.toc,
            };
            page.compose(&ctx);
        }
    }

    /// Draw every page onto the canvas.
    pub fn build(&mut self) -> Result<(), QuireError> {
        let (w, h) = self.config.dimensions();
        self.canvas.new_document(w, h);
        for page in &mut self.pages {
            let frame = Frame {
                w: page.w.unwrap_or(w),
                h: page.h.unwrap_or(h),
            };
            self.canvas.new_page(frame.w, frame.h);
            page.build(0.0, 0.0, self.canvas.as_mut(), frame)?;
        }
        Ok(())
    }

    /// Build, then write the canvas to `path`.
    pub fn export(&mut self, path: &Path, multi_page: bool) -> Result<(), QuireError> {
        self.build()?;
        log::info!("Exporting {} pages to {}", self.pages.len(), path.display());
        self.canvas.save_image(path, multi_page)
    }
}
