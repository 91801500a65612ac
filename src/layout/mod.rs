//! # Pagination
//!
//! A flow pours one [`BabelString`] through a named text-box slot on as many
//! pages as it takes. Each step asks a page builder for a page, puts the
//! remaining text into the page's slot, and keeps whatever did not fit for
//! the next page:
//!
//! 1. Get a page from the builder. It may reuse a page or append one.
//! 2. Find the slot. A page without it ends the flow with a warning.
//! 3. Check the slot has area, then fill it with the remaining text.
//! 4. Stop when nothing is left over. Otherwise the remainder must be
//!    strictly shorter than what went in, or the flow can never finish.
//!
//! The loop is bounded by the document's page cap. A flow that fails
//! discards the pages it appended and reports the error to the composer.

use crate::document::Document;
use crate::error::QuireError;
use crate::text::BabelString;
use crate::theme::Theme;

/// Default cap on the pages one flow may ask for.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Produces the page the next part of a flow lands on. Returns its number.
pub type PageBuilder = fn(&Theme, &mut Document) -> Result<usize, QuireError>;

/// What a flow did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowReport {
    /// Pages that received text, in order.
    pub pages: Vec<usize>,
    /// `false` when the flow stopped early on a page without the slot.
    pub complete: bool,
}

enum Step {
    Done,
    MissingSlot,
    Continue(BabelString),
}

/// Flow `bs` through the `slot` text box of successive pages from
/// `make_page`.
pub fn flow(
    doc: &mut Document,
    theme: &Theme,
    flow_name: &str,
    slot: &str,
    make_page: PageBuilder,
    bs: BabelString,
) -> Result<FlowReport, QuireError> {
    let pages_before = doc.page_count();
    let mut report = FlowReport::default();
    match run(doc, theme, flow_name, slot, make_page, bs, &mut report) {
        Ok(()) => Ok(report),
        Err(e) => {
            doc.truncate_pages(pages_before);
            doc.composer.diagnostics.error(format!("Flow \"{}\" failed: {}", flow_name, e));
            Err(e)
        }
    }
}

fn run(
    doc: &mut Document,
    theme: &Theme,
    flow_name: &str,
    slot: &str,
    make_page: PageBuilder,
    bs: BabelString,
    report: &mut FlowReport,
) -> Result<(), QuireError> {
    let max_pages = doc.config().max_pages;
    let mut remaining = bs;

    for _ in 0..max_pages {
        let pn = make_page(theme, doc)?;
        let step = place(doc, flow_name, slot, pn, remaining)?;
        match step {
            Step::Done => {
                report.pages.push(pn);
                report.complete = true;
                log::debug!("Flow \"{}\" finished on page {}", flow_name, pn);
                return Ok(());
            }
            Step::MissingSlot => {
                doc.composer.diagnostics.warn(format!(
                    "Flow \"{}\": page {} has no text box named \"{}\"",
                    flow_name, pn, slot
                ));
                return Ok(());
            }
            Step::Continue(rest) => {
                report.pages.push(pn);
                log::debug!(
                    "Flow \"{}\": page {} full, {} chars left",
                    flow_name,
                    pn,
                    rest.rendered_len()
                );
                remaining = rest;
            }
        }
    }

    Err(QuireError::PaginationOverflow {
        flow: flow_name.to_string(),
        max_pages,
    })
}

/// Fill one page's slot with `bs` and work out what is left over.
fn place(doc: &mut Document, flow_name: &str, slot: &str, pn: usize, bs: BabelString) -> Result<Step, QuireError> {
    let Some((page, canvas)) = doc.page_and_canvas(pn) else {
        return Ok(Step::MissingSlot);
    };
    let Some(target) = page.find_mut(slot).filter(|e| e.as_text_box().is_some()) else {
        return Ok(Step::MissingSlot);
    };

    let degenerate = |w: f64, h: f64| QuireError::DegenerateBox {
        flow: flow_name.to_string(),
        w,
        h,
    };
    let w = match target.pw() {
        Some(w) if w > 0.0 => w,
        other => return Err(degenerate(other.unwrap_or(0.0), target.ph().unwrap_or(0.0))),
    };
    if let Some(h) = target.ph().filter(|h| *h <= 0.0) {
        return Err(degenerate(w, h));
    }

    let before = bs.rendered_len();
    let rest = target
        .get_overflow(Some(&bs), Some(w), target.ph(), canvas)
        .unwrap_or_default();
    if let Some(tb) = target.as_text_box_mut() {
        tb.bs = bs;
        tb.overflow = None;
    }

    if rest.rendered_len() == 0 {
        return Ok(Step::Done);
    }
    if rest.rendered_len() >= before {
        return Err(QuireError::NoProgress {
            flow: flow_name.to_string(),
            page: pn,
        });
    }
    Ok(Step::Continue(rest))
}
