//! Built-in palettes. Each preset is six base colors in `BASE_NAMES` order.

use super::{Mood, Theme, BASE_COUNT};
use crate::style::Color;

pub const DEFAULT_PRESET: &str = "HappyHolidays";

const PRESETS: [(&str, [&str; BASE_COUNT]); 5] = [
    ("BackToTheCity", ["4E3629", "6E4C1E", "AF6D04", "D3BFB7", "B2B4B3", "EDA04F"]),
    ("BusinessAsUsual", ["003B5C", "E35205", "5B7F95", "A2AAAD", "D9D9D6", "00857C"]),
    ("HappyHolidays", ["C8102E", "006341", "FFCD00", "8A1538", "D0D3D4", "00843D"]),
    ("SeasoningTheDish", ["382E2C", "CE0F69", "64A70B", "D0DF00", "B1AA9C", "C5A900"]),
    ("WordlyWise", ["1D252D", "B7312C", "4F758B", "8B9DA8", "E0D5C6", "C99700"]),
];

/// Names of all built-in presets.
pub fn names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Base colors of a preset.
pub fn base_colors(name: &str) -> Option<[Color; BASE_COUNT]> {
    let (_, hexes) = PRESETS.iter().find(|(n, _)| *n == name)?;
    let mut bases = [Color::BLACK; BASE_COUNT];
    for (slot, hex) in bases.iter_mut().zip(hexes.iter()) {
        *slot = Color::hex(hex);
    }
    Some(bases)
}

/// A preset theme in the given mood, with default fonts and styles.
pub fn preset(name: &str, mood: Mood) -> Option<Theme> {
    base_colors(name).map(|bases| Theme::new(name, bases, mood))
}

pub fn default_theme() -> Theme {
    let bases = base_colors(DEFAULT_PRESET).unwrap_or([Color::gray(0.5); BASE_COUNT]);
    Theme::new(DEFAULT_PRESET, bases, Mood::Light)
}
