//! # Rendering Contract
//!
//! The [`Canvas`] trait is everything the engine needs from a drawing
//! backend. The document owns one boxed canvas, injected at construction,
//! and lends it to elements during build and to text boxes while
//! paginating. Nothing else in the crate knows which backend is in use.
//!
//! Coordinates are points with the origin at the bottom-left of the page
//! and y growing upwards. Text is positioned by its baseline.
//!
//! [`display::DisplayCanvas`] is the reference backend: it records draw
//! operations per page and writes them out as PDF.

pub mod display;

use std::path::Path;

use crate::error::QuireError;
use crate::style::Color;
use crate::text::RichText;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub trait Canvas {
    // ── Lifecycle ──────────────────────────────────────────────
    /// Discard everything drawn so far and start a document whose pages
    /// default to `w` by `h`.
    fn new_document(&mut self, w: f64, h: f64);
    fn new_page(&mut self, w: f64, h: f64);
    /// Write the drawing to `path`. With `multi_page` off only the first
    /// page is written.
    fn save_image(&mut self, path: &Path, multi_page: bool) -> Result<(), QuireError>;

    // ── Paint state ────────────────────────────────────────────
    fn fill(&mut self, color: Option<Color>);
    fn stroke(&mut self, color: Option<Color>, width: f64);

    // ── Primitives ─────────────────────────────────────────────
    fn rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn oval(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn line(&mut self, p1: Point, p2: Point);
    /// Draw the image at `p`. A missing dimension follows the image's aspect
    /// ratio; both missing means natural size.
    fn image(&mut self, path: &Path, p: Point, w: Option<f64>, h: Option<f64>) -> Result<(), QuireError>;
    /// Multiply the current scale.
    fn scale(&mut self, sx: f64, sy: f64);

    // ── Text ───────────────────────────────────────────────────
    /// Draw text with its first baseline at `p`. Only newlines break.
    fn text(&mut self, text: &RichText, p: Point);
    /// Flow text into the box with bottom-left corner `(x, y)` and return
    /// what did not fit.
    fn text_box(&mut self, text: &RichText, x: f64, y: f64, w: f64, h: f64) -> RichText;
    /// What [`Canvas::text_box`] would return, without drawing.
    fn fit_text(&mut self, text: &RichText, w: f64, h: f64) -> RichText;
    /// Size of the text, optionally constrained in width or height.
    fn text_size(&mut self, text: &RichText, w: Option<f64>, h: Option<f64>) -> (f64, f64);
    /// Hyphenate text that does not carry its own setting.
    fn hyphenation(&mut self, on: bool);

    // ── Font metrics ───────────────────────────────────────────
    /// Select the font the metric queries below answer for.
    fn font(&mut self, name: &str, size: f64);
    fn font_ascender(&self) -> f64;
    fn font_descender(&self) -> f64;
    fn font_x_height(&self) -> f64;
    fn font_cap_height(&self) -> f64;

    fn image_size(&self, path: &Path) -> Result<(f64, f64), QuireError>;
}
