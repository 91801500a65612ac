//! # Style System
//!
//! Style records for text runs. A [`Style`] is a set of optional properties;
//! whatever is left unset is filled in from a cascaded default when the
//! record is resolved into [`TextAttributes`], the concrete form a rendering
//! backend consumes.
//!
//! Styles are values. Code that needs a variant of a shared style clones it
//! and changes the clone; the theme's tables are never edited in place.

use serde::{Deserialize, Serialize};

/// Font used when neither the run nor the cascade names one.
pub const DEFAULT_FONT: &str = "Courier";
/// Body size in points.
pub const DEFAULT_FONT_SIZE: f64 = 12.0;
/// Line height as a factor of the font size when none is given.
pub const DEFAULT_LEADING: f64 = 1.4;

/// The set of optional style properties for a text run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Style {
    // ── Identity ───────────────────────────────────────────────
    /// Class name, carried into the markup projection.
    pub name: Option<String>,
    /// Markup tag this run came from (`p`, `h1`, `em`, ...).
    pub tag: Option<String>,

    // ── Typography ─────────────────────────────────────────────
    pub font: Option<String>,
    /// Font size in points.
    pub font_size: Option<f64>,
    /// Absolute line height in points.
    pub line_height: Option<f64>,
    /// Extra space between characters, in points.
    pub tracking: Option<f64>,
    pub align: Option<TextAlign>,
    /// BCP 47 language tag, used for hyphenation.
    pub language: Option<String>,
    pub hyphenation: Option<bool>,

    // ── Paragraph ──────────────────────────────────────────────
    pub paragraph_top_spacing: Option<f64>,
    pub paragraph_bottom_spacing: Option<f64>,

    // ── Color ──────────────────────────────────────────────────
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// An RGBA color, channels in 0.0 - 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn gray(v: f64) -> Self {
        Self::rgb(v, v, v)
    }

    /// Parse `#RGB` or `#RRGGBB`. Malformed input gives `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f64 / 255.0);
        match hex.len() {
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    /// Like [`Color::from_hex`], falling back to black.
    pub fn hex(hex: &str) -> Self {
        Self::from_hex(hex).unwrap_or(Color::BLACK)
    }

    /// `RRGGBB`, uppercase, alpha ignored.
    pub fn to_hex(&self) -> String {
        let byte = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    /// Move each channel the fraction `f` of the way to white.
    pub fn lighter(&self, f: f64) -> Self {
        let mix = |c: f64| c + (1.0 - c) * f;
        Self {
            r: mix(self.r),
            g: mix(self.g),
            b: mix(self.b),
            a: self.a,
        }
    }

    /// Keep the fraction `f` of each channel.
    pub fn darker(&self, f: f64) -> Self {
        Self {
            r: self.r * f,
            g: self.g * f,
            b: self.b * f,
            a: self.a,
        }
    }

    /// Mean of the three color channels.
    pub fn average(&self) -> f64 {
        (self.r + self.g + self.b) / 3.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Resolved text attributes: every value concrete.
///
/// This is the field-by-field translation of a [`Style`] that a rendering
/// backend works with.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAttributes {
    pub font: String,
    pub font_size: f64,
    pub line_height: f64,
    pub tracking: f64,
    pub align: TextAlign,
    pub language: Option<String>,
    pub hyphenation: bool,
    pub paragraph_top_spacing: f64,
    pub paragraph_bottom_spacing: f64,
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
}

impl Default for TextAttributes {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_FONT_SIZE * DEFAULT_LEADING,
            tracking: 0.0,
            align: TextAlign::Left,
            language: None,
            hyphenation: false,
            paragraph_top_spacing: 0.0,
            paragraph_bottom_spacing: 0.0,
            fill: Some(Color::BLACK),
            stroke: None,
            stroke_width: 0.0,
        }
    }
}

impl Style {
    /// A style that only carries a tag.
    pub fn tagged(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Default::default()
        }
    }

    /// Copy of this style with the tag replaced.
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..self.clone()
        }
    }

    /// Cascade `over` on top of this style: every property set in `over`
    /// wins, everything else is kept.
    pub fn merge(&self, over: &Style) -> Style {
        Style {
            name: over.name.clone().or_else(|| self.name.clone()),
            tag: over.tag.clone().or_else(|| self.tag.clone()),
            font: over.font.clone().or_else(|| self.font.clone()),
            font_size: over.font_size.or(self.font_size),
            line_height: over.line_height.or(self.line_height),
            tracking: over.tracking.or(self.tracking),
            align: over.align.or(self.align),
            language: over.language.clone().or_else(|| self.language.clone()),
            hyphenation: over.hyphenation.or(self.hyphenation),
            paragraph_top_spacing: over.paragraph_top_spacing.or(self.paragraph_top_spacing),
            paragraph_bottom_spacing: over
                .paragraph_bottom_spacing
                .or(self.paragraph_bottom_spacing),
            fill: over.fill.or(self.fill),
            stroke: over.stroke.or(self.stroke),
            stroke_width: over.stroke_width.or(self.stroke_width),
        }
    }

    /// Resolve against a parent's attributes (or the engine defaults).
    ///
    /// When only the font size is given, the line height follows it with
    /// [`DEFAULT_LEADING`] instead of inheriting the parent's absolute value.
    pub fn resolve(&self, parent: Option<&TextAttributes>) -> TextAttributes {
        let defaults = TextAttributes::default();
        let parent = parent.unwrap_or(&defaults);

        let font_size = self.font_size.unwrap_or(parent.font_size);
        let line_height = match (self.line_height, self.font_size) {
            (Some(lh), _) => lh,
            (None, Some(size)) => size * DEFAULT_LEADING,
            (None, None) => parent.line_height,
        };

        TextAttributes {
            font: self.font.clone().unwrap_or_else(|| parent.font.clone()),
            font_size,
            line_height,
            tracking: self.tracking.unwrap_or(parent.tracking),
            align: self.align.unwrap_or(parent.align),
            language: self.language.clone().or_else(|| parent.language.clone()),
            hyphenation: self.hyphenation.unwrap_or(parent.hyphenation),
            paragraph_top_spacing: self
                .paragraph_top_spacing
                .unwrap_or(parent.paragraph_top_spacing),
            paragraph_bottom_spacing: self
                .paragraph_bottom_spacing
                .unwrap_or(parent.paragraph_bottom_spacing),
            fill: self.fill.or(parent.fill),
            stroke: self.stroke.or(parent.stroke),
            stroke_width: self.stroke_width.unwrap_or(parent.stroke_width),
        }
    }

    /// Rebuild a style from resolved attributes. Identity (`name`, `tag`)
    /// is not part of the attributes and comes back unset.
    pub fn from_attributes(attrs: &TextAttributes) -> Style {
        Style {
            name: None,
            tag: None,
            font: Some(attrs.font.clone()),
            font_size: Some(attrs.font_size),
            line_height: Some(attrs.line_height),
            tracking: Some(attrs.tracking),
            align: Some(attrs.align),
            language: attrs.language.clone(),
            hyphenation: Some(attrs.hyphenation),
            paragraph_top_spacing: Some(attrs.paragraph_top_spacing),
            paragraph_bottom_spacing: Some(attrs.paragraph_bottom_spacing),
            fill: attrs.fill,
            stroke: attrs.stroke,
            stroke_width: Some(attrs.stroke_width),
        }
    }
}
