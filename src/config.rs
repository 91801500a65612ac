//! # Document Configuration
//!
//! Everything a composition run needs that is not content: page geometry,
//! the theme to use, the template that takes content before any template
//! marker, and the pagination cap. Configuration is plain serde data, so it
//! can be built in code or loaded from JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::QuireError;
use crate::layout::DEFAULT_MAX_PAGES;
use crate::style::Color;
use crate::theme::{presets, FontSet, Mood, Theme};

/// Document-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentConfig {
    pub size: PageSize,
    /// Page padding in points (1/72 inch).
    pub padding: Edges,
    /// Hard cap on the number of pages a single flow may create.
    pub max_pages: usize,
    /// Template that receives content appearing before any template marker.
    pub default_template: String,
    pub theme: ThemeConfig,
    /// Hyphenate flowed text.
    pub hyphenation: bool,
    pub title: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            padding: Edges::uniform(54.0),
            max_pages: DEFAULT_MAX_PAGES,
            default_template: "page".to_string(),
            theme: ThemeConfig::default(),
            hyphenation: false,
            title: None,
        }
    }
}

impl DocumentConfig {
    /// Load a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, QuireError> {
        let config: DocumentConfig = serde_json::from_str(json)?;
        if config.max_pages == 0 {
            return Err(QuireError::Config("maxPages must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        self.size.dimensions()
    }

    /// Width available for flowed content.
    pub fn content_width(&self) -> f64 {
        self.size.dimensions().0 - self.padding.horizontal()
    }

    /// Height available for flowed content.
    pub fn content_height(&self) -> f64 {
        self.size.dimensions().1 - self.padding.vertical()
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Per-side distances, used for padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Which theme to build and how to adjust it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeConfig {
    /// Name of a built-in preset; the default preset when unset.
    pub preset: Option<String>,
    pub mood: Mood,
    /// Base color overrides, keyed by base name (`main`, `accent`, ...),
    /// values as `#RRGGBB`.
    pub colors: BTreeMap<String, String>,
    pub fonts: Option<FontSet>,
}

impl ThemeConfig {
    pub fn build(&self) -> Result<Theme, QuireError> {
        let name = self.preset.as_deref().unwrap_or(presets::DEFAULT_PRESET);
        let mut bases = presets::base_colors(name)
            .ok_or_else(|| QuireError::Config(format!("Unknown theme preset \"{}\"", name)))?;

        for (base, hex) in &self.colors {
            let index = crate::theme::base_index(base)
                .ok_or_else(|| QuireError::Config(format!("Unknown base color \"{}\"", base)))?;
            let color = Color::from_hex(hex)
                .ok_or_else(|| QuireError::Config(format!("Invalid color \"{}\" for {}", hex, base)))?;
            bases[index] = color;
        }

        let fonts = self.fonts.clone().unwrap_or_default();
        Ok(Theme::with_fonts(name, bases, self.mood, fonts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.default_template, "page");
        let (w, h) = config.dimensions();
        assert!((w - 595.28).abs() < 1e-9);
        assert!((h - 841.89).abs() < 1e-9);
        assert!((config.content_width() - (595.28 - 108.0)).abs() < 1e-9);
    }

    #[test]
    fn test_from_json_partial() {
        let config = DocumentConfig::from_json(
            r##"{
                "size": {"Custom": {"width": 400, "height": 300}},
                "padding": {"top": 10, "right": 20, "bottom": 10, "left": 20},
                "maxPages": 12,
                "theme": {"preset": "WordlyWise", "mood": "dark", "colors": {"accent": "#FF0000"}}
            }"##,
        )
        .unwrap();
        assert_eq!(config.dimensions(), (400.0, 300.0));
        assert_eq!(config.content_width(), 360.0);
        assert_eq!(config.content_height(), 280.0);
        assert_eq!(config.max_pages, 12);
        assert_eq!(config.default_template, "page");
        assert_eq!(config.theme.mood, Mood::Dark);

        let theme = config.theme.build().unwrap();
        assert_eq!(theme.mood(), Mood::Dark);
        assert_eq!(theme.color("accent", "middle"), Some(Color::rgb(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_from_json_rejects_zero_cap() {
        let err = DocumentConfig::from_json(r#"{"maxPages": 0}"#).unwrap_err();
        assert!(matches!(err, QuireError::Config(_)));
    }

    #[test]
    fn test_from_json_syntax_error_has_hint() {
        let err = DocumentConfig::from_json(r#"{"maxPages": 3,}"#).unwrap_err();
        match err {
            QuireError::Parse { hint, .. } => assert!(hint.contains("trailing commas")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_theme_config_errors() {
        let unknown = ThemeConfig {
            preset: Some("NoSuchTheme".into()),
            ..Default::default()
        };
        assert!(matches!(unknown.build(), Err(QuireError::Config(_))));

        let mut bad_color = ThemeConfig::default();
        bad_color.colors.insert("main".into(), "#12".into());
        assert!(matches!(bad_color.build(), Err(QuireError::Config(_))));

        let mut bad_base = ThemeConfig::default();
        bad_base.colors.insert("logo9".into(), "#123456".into());
        assert!(matches!(bad_base.build(), Err(QuireError::Config(_))));
    }
}
