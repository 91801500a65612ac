//! # Themes
//!
//! A theme bundles a color palette, a font set and the tag→style table the
//! typesetter reads.
//!
//! The palette is a matrix of `BASE_COUNT` base colors by 9 shades. Shade 4
//! is the literal base color. Shades 0..3 step towards white and shades 5..8
//! step towards black, following [`SHADE_RECIPE`]. In a dark mood each row is
//! reversed, so the "back" shade is the darkest and "front" the lightest.
//!
//! ```text
//!            back                 middle                 front
//!   main     [0] [1] [2] [3]       [4]       [5] [6] [7] [8]
//!   accent   ...
//! ```

pub mod presets;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::style::{Color, Style, TextAlign, DEFAULT_FONT_SIZE};

/// Number of shades per base color.
pub const SHADES: usize = 9;
/// Number of named base colors.
pub const BASE_COUNT: usize = 6;
/// Fractions for shades 0..3 (`lighter`) and 5..8 (`darker`).
pub const SHADE_RECIPE: [f64; SHADES] = [0.8, 0.6, 0.4, 0.2, 0.0, 0.8, 0.6, 0.4, 0.2];
/// Colors with a channel average below this get white ink.
pub const TEXT_COLOR_THRESHOLD: f64 = 0.4;

pub const BASE_NAMES: [&str; BASE_COUNT] = ["main", "accent", "alt1", "alt2", "support1", "support2"];

/// Style names the page-number slots look for.
pub const LEFT_PAGE_NUMBER: &str = "leftPageNumber";
pub const CENTER_PAGE_NUMBER: &str = "centerPageNumber";
pub const RIGHT_PAGE_NUMBER: &str = "rightPageNumber";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Light paper, dark ink.
    #[default]
    Light,
    /// Dark paper, light ink.
    Dark,
}

/// A base or shade index, given either as a number or as an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for ColorRef<'_> {
    fn from(index: usize) -> Self {
        ColorRef::Index(index)
    }
}

impl<'a> From<&'a str> for ColorRef<'a> {
    fn from(name: &'a str) -> Self {
        ColorRef::Name(name)
    }
}

/// Row index for a base alias.
pub fn base_index(name: &str) -> Option<usize> {
    BASE_NAMES.iter().position(|b| *b == name)
}

/// Column index for a shade alias.
pub fn shade_index(name: &str) -> Option<usize> {
    match name {
        "back" => Some(0),
        "background" => Some(1),
        "backward" => Some(2),
        "behind" => Some(3),
        "middle" => Some(4),
        "ahead" => Some(5),
        "forward" => Some(6),
        "foreground" | "hover" => Some(7),
        "front" | "text" => Some(8),
        _ => None,
    }
}

/// Font names for the roles the default styles use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSet {
    pub regular: String,
    pub bold: String,
    pub italic: String,
    pub bold_italic: String,
    pub monospaced: String,
}

impl Default for FontSet {
    fn default() -> Self {
        Self {
            regular: "Courier".to_string(),
            bold: "Courier-Bold".to_string(),
            italic: "Courier-Oblique".to_string(),
            bold_italic: "Courier-BoldOblique".to_string(),
            monospaced: "Courier".to_string(),
        }
    }
}

/// A named palette-plus-style bundle. Read-only once built; share it with
/// `Arc`.
#[derive(Debug, Clone)]
pub struct Theme {
    name: String,
    mood: Mood,
    matrix: Vec<[Color; SHADES]>,
    fonts: FontSet,
    styles: BTreeMap<String, Style>,
}

impl Theme {
    pub fn new(name: &str, bases: [Color; BASE_COUNT], mood: Mood) -> Self {
        Self::with_fonts(name, bases, mood, FontSet::default())
    }

    pub fn with_fonts(name: &str, bases: [Color; BASE_COUNT], mood: Mood, fonts: FontSet) -> Self {
        let matrix: Vec<[Color; SHADES]> = bases.iter().map(|base| shade_row(*base, mood)).collect();
        let mut theme = Self {
            name: name.to_string(),
            mood,
            matrix,
            fonts,
            styles: BTreeMap::new(),
        };
        theme.styles = default_styles(&theme);
        theme
    }

    /// Copy of this theme with one tag style replaced.
    pub fn with_style(&self, tag: &str, style: Style) -> Self {
        let mut theme = self.clone();
        theme.styles.insert(tag.to_string(), style);
        theme
    }

    /// Copy of this theme without the style for `tag`.
    pub fn without_style(&self, tag: &str) -> Self {
        let mut theme = self.clone();
        theme.styles.remove(tag);
        theme
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mood(&self) -> Mood {
        self.mood
    }

    pub fn fonts(&self) -> &FontSet {
        &self.fonts
    }

    pub fn style(&self, tag: &str) -> Option<&Style> {
        self.styles.get(tag)
    }

    pub fn styles(&self) -> &BTreeMap<String, Style> {
        &self.styles
    }

    /// Color at `(base, shade)`. Out-of-range indices and unknown aliases
    /// give `None`.
    pub fn color<'a>(&self, base: impl Into<ColorRef<'a>>, shade: impl Into<ColorRef<'a>>) -> Option<Color> {
        let row = match base.into() {
            ColorRef::Index(i) => i,
            ColorRef::Name(name) => base_index(name)?,
        };
        let col = match shade.into() {
            ColorRef::Index(i) => i,
            ColorRef::Name(name) => shade_index(name)?,
        };
        self.matrix.get(row)?.get(col).copied()
    }

    /// Color by a space-separated name: `"main"`, `"main back"` or
    /// `"main back diap"`, where `diap` mirrors the shade (8 - shade).
    /// `white` and `black` are accepted as-is.
    pub fn color_named(&self, name: &str) -> Option<Color> {
        let parts: Vec<&str> = name.split_whitespace().collect();
        match parts.as_slice() {
            ["white"] => Some(Color::WHITE),
            ["black"] => Some(Color::BLACK),
            [base] => self.color(*base, "middle"),
            [base, shade] => self.color(*base, *shade),
            [base, shade, "diap"] => {
                let col = shade_index(shade)?;
                self.color(*base, SHADES - 1 - col)
            }
            _ => None,
        }
    }

    /// Black or white, whichever reads on the color at `(base, shade)`.
    pub fn text_color<'a>(&self, base: impl Into<ColorRef<'a>>, shade: impl Into<ColorRef<'a>>) -> Option<Color> {
        let c = self.color(base, shade)?;
        Some(if c.average() < TEXT_COLOR_THRESHOLD {
            Color::WHITE
        } else {
            Color::BLACK
        })
    }
}

fn shade_row(base: Color, mood: Mood) -> [Color; SHADES] {
    let mut row = [base; SHADES];
    for (i, f) in SHADE_RECIPE.iter().enumerate() {
        row[i] = match i {
            0..=3 => base.lighter(*f),
            4 => base,
            _ => base.darker(*f),
        };
    }
    if mood == Mood::Dark {
        row.reverse();
    }
    row
}

/// The default tag table, derived from the theme's fonts and colors.
fn default_styles(theme: &Theme) -> BTreeMap<String, Style> {
    let ps = DEFAULT_FONT_SIZE;
    let ink = theme.text_color("main", "back").unwrap_or(Color::BLACK);
    let accent = theme.color("accent", "text").unwrap_or(ink);
    let fonts = &theme.fonts;

    let text = |font: &str, size: f64, leading: f64, fill: Color| Style {
        font: Some(font.to_string()),
        font_size: Some(size),
        line_height: Some(leading * ps),
        fill: Some(fill),
        ..Default::default()
    };

    let mut styles = BTreeMap::new();
    styles.insert("h1".into(), text(&fonts.bold, 3.0 * ps, 3.3, ink));
    styles.insert("h2".into(), text(&fonts.bold, 2.5 * ps, 3.0, ink));
    styles.insert("h3".into(), text(&fonts.italic, 2.0 * ps, 2.6, ink));
    styles.insert("h4".into(), text(&fonts.regular, 1.5 * ps, 2.1, ink));
    styles.insert("h5".into(), text(&fonts.bold, ps, 1.4, ink));
    styles.insert("h6".into(), text(&fonts.italic, ps, 1.4, ink));
    for (tag, font) in [
        ("p", &fonts.regular),
        ("b", &fonts.bold),
        ("strong", &fonts.bold),
        ("em", &fonts.italic),
        ("i", &fonts.italic),
        ("bi", &fonts.bold_italic),
        ("img", &fonts.bold_italic),
        ("hr", &fonts.regular),
        ("code", &fonts.monospaced),
        ("python", &fonts.monospaced),
        ("blockquote", &fonts.italic),
        ("ul", &fonts.regular),
        ("ol", &fonts.regular),
        ("li", &fonts.regular),
    ] {
        styles.insert(tag.into(), text(font, ps, 1.4, ink));
    }
    styles.insert("a".into(), text(&fonts.bold, ps, 1.4, accent));

    let page_number = |align: TextAlign| Style {
        align: Some(align),
        ..text(&fonts.regular, 0.75 * ps, 1.0, ink)
    };
    styles.insert(LEFT_PAGE_NUMBER.into(), page_number(TextAlign::Left));
    styles.insert(RIGHT_PAGE_NUMBER.into(), page_number(TextAlign::Right));
    styles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bases() -> [Color; BASE_COUNT] {
        [
            Color::hex("4E3629"),
            Color::hex("6E4C1E"),
            Color::hex("AF6D04"),
            Color::hex("D3BFB7"),
            Color::hex("B2B4B3"),
            Color::hex("EDA04F"),
        ]
    }

    #[test]
    fn test_middle_shade_is_base() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        for (row, base) in bases().iter().enumerate() {
            assert_eq!(theme.color(row, 4usize), Some(*base));
        }
        assert_eq!(theme.color("main", "middle"), Some(bases()[0]));
    }

    #[test]
    fn test_light_row_runs_light_to_dark() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        for shade in 1..SHADES {
            let lighter = theme.color("accent", shade - 1).unwrap();
            let next = theme.color("accent", shade).unwrap();
            assert!(lighter.average() > next.average(), "shade {} not darker", shade);
        }
    }

    #[test]
    fn test_mood_symmetry() {
        let light = Theme::new("Test", bases(), Mood::Light);
        let dark = Theme::new("Test", bases(), Mood::Dark);
        for base in 0..BASE_COUNT {
            for shade in 0..SHADES {
                assert_eq!(light.color(base, shade), dark.color(base, SHADES - 1 - shade));
            }
        }
    }

    #[test]
    fn test_aliases_match_indices() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        assert_eq!(theme.color("support2", "back"), theme.color(5usize, 0usize));
        assert_eq!(theme.color("alt1", "background"), theme.color(2usize, 1usize));
        assert_eq!(theme.color("main", "hover"), theme.color("main", "foreground"));
        assert_eq!(theme.color("main", "text"), theme.color("main", "front"));
        assert_eq!(theme.color("main", "front"), theme.color(0usize, 8usize));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        assert!(theme.color(BASE_COUNT, 0usize).is_none());
        assert!(theme.color(0usize, SHADES).is_none());
        assert!(theme.color("logo1", "middle").is_none());
        assert!(theme.color("main", "sideways").is_none());
    }

    #[test]
    fn test_color_named_with_diap() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        assert_eq!(theme.color_named("main back diap"), theme.color("main", "front"));
        assert_eq!(theme.color_named("accent front diap"), theme.color("accent", "back"));
        assert_eq!(theme.color_named("alt2"), theme.color("alt2", "middle"));
        assert_eq!(theme.color_named("white"), Some(Color::WHITE));
        assert!(theme.color_named("main back diap extra").is_none());
    }

    #[test]
    fn test_text_color_threshold() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        assert_eq!(theme.text_color("main", "back"), Some(Color::BLACK));
        assert_eq!(theme.text_color("main", "front"), Some(Color::WHITE));

        let dark = Theme::new("Test", bases(), Mood::Dark);
        assert_eq!(dark.text_color("main", "back"), Some(Color::WHITE));
    }

    #[test]
    fn test_default_styles_follow_fonts_and_mood() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        let h1 = theme.style("h1").unwrap();
        assert_eq!(h1.font.as_deref(), Some("Courier-Bold"));
        assert_eq!(h1.font_size, Some(36.0));
        assert_eq!(theme.style("p").unwrap().fill, Some(Color::BLACK));
        assert!(theme.style("leftPageNumber").is_some());
        assert!(theme.style("centerPageNumber").is_none());

        let dark = Theme::new("Test", bases(), Mood::Dark);
        assert_eq!(dark.style("p").unwrap().fill, Some(Color::WHITE));
    }

    #[test]
    fn test_with_style_leaves_original_untouched() {
        let theme = Theme::new("Test", bases(), Mood::Light);
        let custom = theme.with_style("p", Style::tagged("p"));
        assert_eq!(custom.style("p"), Some(&Style::tagged("p")));
        assert_ne!(theme.style("p"), Some(&Style::tagged("p")));
        assert!(theme.without_style("p").style("p").is_none());
    }
}
