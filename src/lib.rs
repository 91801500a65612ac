//! # Quire
//!
//! A page-composition engine for books and booklets.
//!
//! Marked-up content is typeset into a galley, one long column of styled
//! text boxes, images and markers. Markers in the galley pick page
//! templates, and the templates pour the galley onto pages, flowing text
//! from one page's box into the next until it is all placed. Only then is
//! anything drawn, through a [`Canvas`](canvas::Canvas) chosen by the
//! caller.
//!
//! ## Architecture
//!
//! ```text
//! Input (XML / JSON node tree)
//!       ↓
//!   [typesetter]: markup nodes to a galley of text boxes and markers
//!       ↓
//!   [template]  : markers pick templates, templates create pages
//!       ↓
//!   [layout]    : flow text through page slots until it is placed
//!       ↓
//!   [element]   : compose (bound templates), then build onto the canvas
//!       ↓
//!   [canvas]    : draw operations; the display canvas writes PDF
//! ```

pub mod canvas;
pub mod config;
pub mod document;
pub mod element;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod pdf;
pub mod style;
pub mod template;
pub mod text;
pub mod theme;
pub mod typesetter;

pub use canvas::display::DisplayCanvas;
pub use canvas::Canvas;
pub use config::DocumentConfig;
pub use document::Document;
pub use error::QuireError;
pub use typesetter::MarkupNode;

/// Typeset `root`, run the templates over the galley and compose every
/// page. The document is ready to [`export`](Document::export).
pub fn compose_markup(
    root: &MarkupNode,
    config: DocumentConfig,
    canvas: Box<dyn Canvas>,
) -> Result<Document, QuireError> {
    let mut doc = Document::from_config(config, canvas)?;
    let galley = doc.typeset(root);
    log::debug!("Galley holds {} elements", galley.len());
    doc.compose_galley(galley)?;
    doc.compose();
    Ok(doc)
}

/// Compose an XML fragment with a JSON configuration (defaults when `None`)
/// onto the display canvas.
pub fn compose_xml(xml: &str, config_json: Option<&str>) -> Result<Document, QuireError> {
    let config = match config_json {
        Some(json) => DocumentConfig::from_json(json)?,
        None => DocumentConfig::default(),
    };
    let mut canvas = DisplayCanvas::new();
    if let Some(title) = &config.title {
        canvas = canvas.with_title(title);
    }
    compose_markup(&MarkupNode::from_xml(xml)?, config, Box::new(canvas))
}
