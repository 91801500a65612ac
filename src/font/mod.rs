//! # Font Management
//!
//! Font lookup and metrics for the reference canvas.
//!
//! Without registered fonts every family resolves to one of the four
//! Courier faces, standard PDF fonts that need no embedding and have a fixed
//! advance of 600 units, which keeps measurement deterministic. TrueType
//! fonts can be registered under any name; their metrics come from
//! ttf-parser and they are embedded when exported.

use std::collections::HashMap;

use crate::error::QuireError;

/// Units per em of the standard Type1 fonts.
const STANDARD_UNITS_PER_EM: u16 = 1000;
/// Advance width of every Courier glyph, in font units.
const COURIER_ADVANCE: u16 = 600;

/// Vertical metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub x_height: i16,
    pub cap_height: i16,
}

impl FontMetrics {
    /// From the Courier AFM files.
    pub const COURIER: FontMetrics = FontMetrics {
        units_per_em: STANDARD_UNITS_PER_EM,
        ascender: 629,
        descender: -157,
        x_height: 426,
        cap_height: 562,
    };

    /// Scale a value in font units to points at `font_size`.
    pub fn scale(&self, units: i16, font_size: f64) -> f64 {
        units as f64 / self.units_per_em as f64 * font_size
    }
}

/// The Courier faces of the standard 14 PDF fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// Pick the face matching the weight and slant words in a font name.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");
        match (bold, italic) {
            (false, false) => Self::Courier,
            (true, false) => Self::CourierBold,
            (false, true) => Self::CourierOblique,
            (true, true) => Self::CourierBoldOblique,
        }
    }

    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFont {
    pub data: Vec<u8>,
    pub metrics: FontMetrics,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
}

impl CustomFont {
    /// Parse font data. Fails when ttf-parser cannot read the face.
    pub fn from_font_data(data: Vec<u8>) -> Result<Self, QuireError> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| QuireError::Font(e.to_string()))?;
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();

        let mut advance_widths = HashMap::new();
        let mut default_advance = 0u16;
        for code in 32u32..=0xFFFF {
            if let Some(ch) = char::from_u32(code) {
                if let Some(glyph_id) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    advance_widths.insert(ch, advance);
                    if ch == ' ' {
                        default_advance = advance;
                    }
                }
            }
        }
        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        let metrics = FontMetrics {
            units_per_em,
            ascender,
            descender,
            x_height: face.x_height().unwrap_or(ascender / 2),
            cap_height: face.capital_height().unwrap_or((ascender as f64 * 0.7) as i16),
        };

        Ok(Self {
            data,
            metrics,
            advance_widths,
            default_advance,
        })
    }

    fn advance(&self, ch: char) -> u16 {
        self.advance_widths.get(&ch).copied().unwrap_or(self.default_advance)
    }
}

/// What a font name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum FontFace<'a> {
    Standard(StandardFont),
    Custom(&'a CustomFont),
}

/// A font registry keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    custom: HashMap<String, CustomFont>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register TrueType data under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, data: Vec<u8>) -> Result<(), QuireError> {
        let font = CustomFont::from_font_data(data)?;
        self.custom.insert(name.to_string(), font);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> FontFace<'_> {
        match self.custom.get(name) {
            Some(font) => FontFace::Custom(font),
            None => FontFace::Standard(StandardFont::from_name(name)),
        }
    }

    pub fn metrics(&self, name: &str) -> FontMetrics {
        match self.resolve(name) {
            FontFace::Standard(_) => FontMetrics::COURIER,
            FontFace::Custom(font) => font.metrics,
        }
    }

    /// Advance width of `ch` in points.
    pub fn char_width(&self, ch: char, name: &str, font_size: f64) -> f64 {
        let (advance, upm) = match self.resolve(name) {
            FontFace::Standard(_) => (COURIER_ADVANCE, STANDARD_UNITS_PER_EM),
            FontFace::Custom(font) => (font.advance(ch), font.metrics.units_per_em),
        };
        advance as f64 / upm as f64 * font_size
    }

    pub fn measure_string(&self, text: &str, name: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, name, font_size)).sum()
    }

    pub fn custom_fonts(&self) -> impl Iterator<Item = (&String, &CustomFont)> {
        self.custom.iter()
    }
}
