//! Single-column page templates.
//!
//! Every page gets the same frame: a `main` text box filling the content
//! area and page-number slots in the bottom margin. Flowing templates pour
//! their text through `main`; title templates place one page each.

use std::sync::Arc;

use super::{TemplateSet, TocEntry};
use crate::document::Document;
use crate::element::{ComposeContext, Element, ElementKind, Image, TextBox};
use crate::error::QuireError;
use crate::layout;
use crate::style::{Color, Style};
use crate::text::BabelString;
use crate::theme::{Mood, Theme, CENTER_PAGE_NUMBER, LEFT_PAGE_NUMBER, RIGHT_PAGE_NUMBER};

pub const MAIN: &str = "main";
pub const PN_LEFT: &str = "pnLeft";
pub const PN_CENTER: &str = "pnCenter";
pub const PN_RIGHT: &str = "pnRight";

const TOC_HEADING: &str = "Contents";

pub struct OneColumnTemplates;

impl OneColumnTemplates {
    pub fn template_set() -> TemplateSet {
        let mut set = TemplateSet::new("page");
        set.register("cover", cover)
            .register("frenchTitle", french_title)
            .register("title", title)
            .register("tableOfContent", table_of_content)
            .register("page", page)
            .register("chapter", chapter)
            .register("index", index)
            .register("colophon", colophon)
            .register("footnote", footnote)
            .register("literature", literature);
        set
    }
}

// ── Pages ──────────────────────────────────────────────────────

/// The page templates write to next. The composer's current page is reused
/// while it is still blank, unless a new page is asked for.
pub fn initialize_page(doc: &mut Document, make_new_page: bool) -> usize {
    if !make_new_page {
        let current = doc
            .composer
            .page
            .filter(|pn| doc.page(*pn).is_some_and(is_blank));
        if let Some(pn) = current {
            return pn;
        }
    }
    let pn = doc.new_page();
    let theme = Arc::clone(doc.theme());
    if let Some(page) = doc.page_mut(pn) {
        add_frame(&theme, page);
    }
    doc.composer.page = Some(pn);
    pn
}

/// Only the frame is on the page and `main` is still empty.
fn is_blank(page: &Element) -> bool {
    page.children().iter().all(|child| match child.name.as_str() {
        MAIN => child.as_text_box().is_some_and(|tb| tb.bs.rendered_len() == 0),
        PN_LEFT | PN_CENTER | PN_RIGHT => true,
        _ => false,
    })
}

fn add_frame(theme: &Theme, page: &mut Element) {
    let (Some(w), Some(cw), Some(ch)) = (page.w, page.pw(), page.ph()) else {
        return;
    };
    let mut main = TextBox::element(BabelString::default(), cw)
        .named(MAIN)
        .at(page.pl(), page.pb());
    main.h = Some(ch);
    page.add_element(main);

    let number = page.page_number().unwrap_or(0);
    let y = page.pb() / 2.0;
    let slots = [
        (PN_LEFT, LEFT_PAGE_NUMBER, number % 2 == 0, page.pl()),
        (PN_CENTER, CENTER_PAGE_NUMBER, true, w / 2.0),
        (PN_RIGHT, RIGHT_PAGE_NUMBER, number % 2 == 1, w - page.pr()),
    ];
    for (slot, style, wanted, x) in slots {
        if wanted && theme.style(style).is_some() {
            page.add_element(
                Element::text(BabelString::default(), x, y)
                    .named(slot)
                    .with_template(page_number_text),
            );
        }
    }
}

fn page_number_text(ctx: &ComposeContext, element: &mut Element) {
    let tag = match element.name.as_str() {
        PN_LEFT => LEFT_PAGE_NUMBER,
        PN_CENTER => CENTER_PAGE_NUMBER,
        _ => RIGHT_PAGE_NUMBER,
    };
    let style = ctx.theme.style(tag).map(|s| s.with_tag(tag));
    element.kind = ElementKind::Text(BabelString::new(ctx.page_number.to_string(), style));
}

fn continue_page(_: &Theme, doc: &mut Document) -> Result<usize, QuireError> {
    Ok(initialize_page(doc, false))
}

// ── Flowing templates ──────────────────────────────────────────

fn page(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    place_run(theme, doc, "page")
}

fn chapter(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    let pn = initialize_page(doc, true);
    if let Some(title) = first_line(&doc.composer.elements) {
        doc.composer.toc.push(TocEntry { title, page: pn });
    }
    place_run(theme, doc, "chapter")
}

fn index(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    initialize_page(doc, true);
    place_run(theme, doc, "index")
}

fn colophon(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    initialize_page(doc, true);
    place_run(theme, doc, "colophon")
}

/// Flow the text of the run through `main` and put every image on a page of
/// its own. Consecutive text boxes flow as one text, so a reference marker
/// between them does not break the paragraph.
fn place_run(theme: &Theme, doc: &mut Document, flow_name: &str) -> Result<(), QuireError> {
    let elements = std::mem::take(&mut doc.composer.elements);
    let mut pending: Option<BabelString> = None;
    for element in elements {
        match element.kind {
            ElementKind::TextBox(tb) => match pending.as_mut() {
                Some(bs) => bs.concat(&tb.bs),
                None => pending = Some(tb.bs),
            },
            ElementKind::Marker(marker) => doc.composer.verbose.push(format!(
                "{}: {} marker {}",
                flow_name,
                marker.kind,
                marker.reference.unwrap_or_default()
            )),
            ElementKind::Image(image) => {
                flow_pending(theme, doc, flow_name, pending.take())?;
                place_image(doc, image)?;
            }
            other => {
                flow_pending(theme, doc, flow_name, pending.take())?;
                doc.composer.diagnostics.warn(format!(
                    "Template \"{}\" cannot place a {} element",
                    flow_name,
                    other.kind_name()
                ));
            }
        }
    }
    flow_pending(theme, doc, flow_name, pending)
}

fn flow_pending(
    theme: &Theme,
    doc: &mut Document,
    flow_name: &str,
    pending: Option<BabelString>,
) -> Result<(), QuireError> {
    match pending {
        Some(bs) if bs.rendered_len() > 0 => {
            layout::flow(doc, theme, flow_name, MAIN, continue_page, bs)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// A fresh page with the image at the top of the content area, as wide as
/// the content area allows.
fn place_image(doc: &mut Document, image: Image) -> Result<(), QuireError> {
    let (cw, ch) = (doc.config().content_width(), doc.config().content_height());
    let (w, h) = match image.path() {
        Some(path) => fit_width(doc.canvas_mut().image_size(path)?, cw, ch),
        None => (cw, cw * 0.75),
    };
    let pn = initialize_page(doc, true);
    if let Some(page) = doc.page_mut(pn) {
        let top = page.h.unwrap_or(0.0) - page.pt();
        let x = page.pl();
        page.add_element(Element::image(image).named("img").at(x, top - h).size(w, h));
    }
    Ok(())
}

/// Scale `(iw, ih)` to width `cw`, shrinking further to stay within `ch`.
fn fit_width((iw, ih): (f64, f64), cw: f64, ch: f64) -> (f64, f64) {
    if iw <= 0.0 || ih <= 0.0 {
        return (0.0, 0.0);
    }
    let h = ih * cw / iw;
    if h > ch {
        (cw * ch / h, ch)
    } else {
        (cw, h)
    }
}

// ── Title pages ────────────────────────────────────────────────

fn cover(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    title_page(theme, doc, true, true)
}

fn title(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    title_page(theme, doc, false, true)
}

fn french_title(theme: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    title_page(theme, doc, false, false)
}

fn title_page(theme: &Theme, doc: &mut Document, background: bool, with_image: bool) -> Result<(), QuireError> {
    let elements = std::mem::take(&mut doc.composer.elements);
    let mut heading = None;
    let mut image = None;
    for element in elements {
        match element.kind {
            ElementKind::TextBox(tb) if heading.is_none() => heading = Some(tb.bs),
            ElementKind::Image(img) if image.is_none() => image = Some(img),
            _ => {}
        }
    }

    let shade = match theme.mood() {
        Mood::Light => "front",
        Mood::Dark => "back",
    };
    let fill = theme.color("main", shade).unwrap_or(Color::BLACK);
    let ink = theme.text_color("main", shade).unwrap_or(Color::WHITE);

    let image_size = match image.as_ref().and_then(Image::path) {
        Some(path) if with_image => {
            let cw = doc.config().content_width() / 2.0;
            let ch = doc.config().content_height() / 2.0;
            Some(fit_width(doc.canvas_mut().image_size(path)?, cw, ch))
        }
        _ => None,
    };

    let pn = initialize_page(doc, true);
    let mut overflowed = false;
    if let Some((page, canvas)) = doc.page_and_canvas(pn) {
        let (w, h) = (page.w.unwrap_or(0.0), page.h.unwrap_or(0.0));
        if background {
            page.children_mut()
                .insert(0, Element::rect(0.0, 0.0, w, h).named("background").with_fill(fill));
        }
        if let (Some((iw, ih)), Some(img)) = (image_size, image) {
            let x = (w - iw) / 2.0;
            let y = page.pb();
            page.add_element(Element::image(img).named("img").at(x, y).size(iw, ih));
        }
        if let Some(bs) = heading {
            let bs = if background { recolor(&bs, ink) } else { bs };
            if let Some(main) = page.find_mut(MAIN) {
                overflowed = main
                    .get_overflow(Some(&bs), None, None, canvas)
                    .is_some_and(|rest| rest.rendered_len() > 0);
                if let Some(tb) = main.as_text_box_mut() {
                    tb.bs = bs;
                }
            }
        }
    }
    if overflowed {
        doc.composer
            .diagnostics
            .warn(format!("Title on page {} does not fit and is cut", pn));
    }
    Ok(())
}

/// Copy of `bs` with every run filled in `color`.
fn recolor(bs: &BabelString, color: Color) -> BabelString {
    let mut out: Option<BabelString> = None;
    for run in bs.runs() {
        let style = Style {
            fill: Some(color),
            ..run.style().clone()
        };
        match out.as_mut() {
            Some(out) => out.append(run.text(), Some(style)),
            None => out = Some(BabelString::new(run.text(), Some(style))),
        }
    }
    let mut out = out.unwrap_or_default();
    out.set_hyphenation(bs.hyphenation());
    out
}

fn first_line(elements: &[Element]) -> Option<String> {
    let text = elements.iter().find_map(|e| e.as_text_box())?.bs.text();
    let line = text.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_string())
}

// ── Table of contents ──────────────────────────────────────────

fn table_of_content(_: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    let elements = std::mem::take(&mut doc.composer.elements);
    if !elements.is_empty() {
        doc.composer
            .verbose
            .push(format!("tableOfContent: {} elements ignored", elements.len()));
    }
    let pn = initialize_page(doc, true);
    if let Some(main) = doc.page_mut(pn).and_then(|p| p.find_mut(MAIN)) {
        main.template = Some(crate::element::BoundTemplate(toc_text));
    }
    Ok(())
}

/// Entries are only complete once every chapter is placed, so the list is
/// written at compose time.
fn toc_text(ctx: &ComposeContext, element: &mut Element) {
    let heading = ctx.theme.style("h2").map(|s| s.with_tag("h2"));
    let entry = ctx.theme.style("p").map(|s| s.with_tag("p"));
    let mut bs = BabelString::new(format!("{}\n", TOC_HEADING), heading);
    for TocEntry { title, page } in ctx.toc {
        bs.append(&format!("{}  {}\n", title, page), entry.clone());
    }
    if let Some(tb) = element.as_text_box_mut() {
        tb.bs = bs;
    }
}

// ── References ─────────────────────────────────────────────────

fn footnote(_: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    record_run(doc, "footnote");
    Ok(())
}

fn literature(_: &Theme, doc: &mut Document) -> Result<(), QuireError> {
    record_run(doc, "literature");
    Ok(())
}

fn record_run(doc: &mut Document, name: &str) {
    let elements = std::mem::take(&mut doc.composer.elements);
    for element in elements {
        let line = match &element.kind {
            ElementKind::TextBox(tb) => format!("{}: {}", name, tb.bs.text().trim_end()),
            kind => format!("{}: {}", name, kind.kind_name()),
        };
        doc.composer.verbose.push(line);
    }
}
