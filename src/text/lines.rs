//! # Line Breaking
//!
//! Greedy line breaking over [`RichText`], shared by every measurement and
//! drawing path of the reference canvas.
//!
//! Break opportunities come from UAX#14 via `unicode-linebreak`. A word that
//! does not fit on an otherwise empty line is split at a syllable boundary
//! (through `hypher`) when hyphenation is on, and at the last fitting
//! character when it is not.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use super::RichText;
use crate::font::FontBook;
use crate::style::TextAttributes;

/// Slack for accumulated floating-point widths and heights.
pub const FIT_EPSILON: f64 = 1e-6;

const SOFT_HYPHEN: char = '\u{00AD}';

/// One laid-out line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// First character (index into the flattened text).
    pub start: usize,
    /// One past the last character consumed, trailing space and newline
    /// included. The next line starts here.
    pub end: usize,
    /// Visible characters with the index of their span. May end in an
    /// inserted `-` when the line was hyphenated.
    pub chars: Vec<(char, usize)>,
    /// X offset of each visible character from the line start.
    pub positions: Vec<f64>,
    /// Width without trailing spaces.
    pub width: f64,
    /// Advance to the next line, paragraph spacing included.
    pub height: f64,
    /// Largest ascender on the line, in points.
    pub ascent: f64,
    /// The line ends at a newline or at the end of the text.
    pub paragraph_end: bool,
}

impl Line {
    pub fn text(&self) -> String {
        self.chars.iter().map(|(ch, _)| ch).collect()
    }
}

/// Lines that fit a box and how much of the text they consume.
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    pub lines: Vec<Line>,
    /// Characters consumed by the fitted lines.
    pub consumed: usize,
    /// Total height of the fitted lines.
    pub height: f64,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Each entry is the opportunity *before* that character. Index 0 is always
/// `None`, and the implicit break at the end of the text is dropped.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }
    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Map a BCP 47 tag to a hyphenation dictionary. No tag means English;
/// unsupported languages disable hyphenation.
fn resolve_hypher_lang(lang: Option<&str>) -> Option<hypher::Lang> {
    let tag = match lang {
        Some(t) => t,
        None => return Some(hypher::Lang::English),
    };
    let primary = tag.split(['-', '_']).next().unwrap_or(tag).to_lowercase();
    match primary.as_str() {
        "ca" => Some(hypher::Lang::Catalan),
        "cs" => Some(hypher::Lang::Czech),
        "da" => Some(hypher::Lang::Danish),
        "nl" => Some(hypher::Lang::Dutch),
        "en" => Some(hypher::Lang::English),
        "fi" => Some(hypher::Lang::Finnish),
        "fr" => Some(hypher::Lang::French),
        "de" => Some(hypher::Lang::German),
        "hu" => Some(hypher::Lang::Hungarian),
        "it" => Some(hypher::Lang::Italian),
        "la" => Some(hypher::Lang::Latin),
        "nb" | "nn" | "no" => Some(hypher::Lang::Norwegian),
        "pl" => Some(hypher::Lang::Polish),
        "pt" => Some(hypher::Lang::Portuguese),
        "ru" => Some(hypher::Lang::Russian),
        "es" => Some(hypher::Lang::Spanish),
        "sv" => Some(hypher::Lang::Swedish),
        "tr" => Some(hypher::Lang::Turkish),
        "uk" => Some(hypher::Lang::Ukrainian),
        _ => None,
    }
}

struct Breaker<'a> {
    text: &'a RichText,
    fonts: &'a FontBook,
    chars: Vec<(char, usize)>,
    widths: Vec<f64>,
}

impl<'a> Breaker<'a> {
    fn new(text: &'a RichText, fonts: &'a FontBook) -> Self {
        let chars = text.styled_chars();
        let widths = chars
            .iter()
            .map(|&(ch, span)| {
                if is_newline(ch) || ch == SOFT_HYPHEN {
                    0.0
                } else {
                    let attrs = &text.spans[span].attrs;
                    fonts.char_width(ch, &attrs.font, attrs.font_size) + attrs.tracking
                }
            })
            .collect();
        Self {
            text,
            fonts,
            chars,
            widths,
        }
    }

    fn attrs(&self, span: usize) -> &TextAttributes {
        &self.text.spans[span].attrs
    }

    fn hyphen_width(&self, span: usize) -> f64 {
        let attrs = self.attrs(span);
        self.fonts.char_width('-', &attrs.font, attrs.font_size) + attrs.tracking
    }

    fn width_of(&self, from: usize, to_inclusive: usize) -> f64 {
        self.widths[from..=to_inclusive].iter().sum()
    }

    /// Find the rightmost syllable boundary inside the word that overflows
    /// at `overflow_at` whose prefix fits with a hyphen. Returns the index
    /// to break before.
    fn try_hyphenate(&self, line_start: usize, overflow_at: usize, max_width: f64) -> Option<usize> {
        let span = self.chars[line_start].1;
        let attrs = self.attrs(span);
        if !(attrs.hyphenation || self.text.hyphenation) {
            return None;
        }
        let lang = attrs.language.as_deref().or(self.text.language.as_deref());
        let hypher_lang = resolve_hypher_lang(lang)?;

        let mut word_start = overflow_at;
        while word_start > line_start && !self.chars[word_start - 1].0.is_whitespace() {
            word_start -= 1;
        }
        let mut word_end = overflow_at;
        while word_end < self.chars.len() && self.chars[word_end].0.is_alphabetic() {
            word_end += 1;
        }
        if word_end <= word_start {
            return None;
        }

        let word: String = self.chars[word_start..word_end].iter().map(|(c, _)| c).collect();
        let syllables: Vec<&str> = hypher::hyphenate(&word, hypher_lang).collect();
        if syllables.len() < 2 {
            return None;
        }

        let prefix_width: f64 = self.widths[line_start..word_start].iter().sum();
        let hyphen_width = self.hyphen_width(span);
        let mut best = None;
        let mut offset = word_start;
        for syllable in &syllables[..syllables.len() - 1] {
            offset += syllable.chars().count();
            if offset > overflow_at {
                break;
            }
            let part: f64 = self.widths[word_start..offset].iter().sum();
            if prefix_width + part + hyphen_width <= max_width + FIT_EPSILON {
                best = Some(offset);
            }
        }
        best.filter(|&b| b > line_start)
    }

    fn make_line(&self, start: usize, end: usize, hyphenated: bool, paragraph_end: bool) -> Line {
        let mut chars = Vec::new();
        let mut positions = Vec::new();
        let mut x = 0.0;
        for i in start..end {
            let (ch, span) = self.chars[i];
            if is_newline(ch) || ch == SOFT_HYPHEN {
                continue;
            }
            chars.push((ch, span));
            positions.push(x);
            x += self.widths[i];
        }
        if hyphenated {
            let span = self.chars[end - 1].1;
            chars.push(('-', span));
            positions.push(x);
            x += self.hyphen_width(span);
        }

        let mut width = x;
        for (k, (ch, _)) in chars.iter().enumerate().rev() {
            if *ch != ' ' {
                break;
            }
            width = positions[k];
        }

        let paragraph_start = start == 0 || is_newline(self.chars[start - 1].0);
        let mut line_height: f64 = 0.0;
        let mut ascent: f64 = 0.0;
        let mut top: f64 = 0.0;
        let mut bottom: f64 = 0.0;
        for &(_, span) in &self.chars[start..end] {
            let attrs = self.attrs(span);
            let metrics = self.fonts.metrics(&attrs.font);
            line_height = line_height.max(attrs.line_height);
            ascent = ascent.max(metrics.scale(metrics.ascender, attrs.font_size));
            top = top.max(attrs.paragraph_top_spacing);
            bottom = bottom.max(attrs.paragraph_bottom_spacing);
        }
        let mut height = line_height;
        if paragraph_start {
            height += top;
        }
        if paragraph_end {
            height += bottom;
        }

        Line {
            start,
            end,
            chars,
            positions,
            width,
            height,
            ascent,
            paragraph_end,
        }
    }

    fn run(&self, max_width: Option<f64>) -> Vec<Line> {
        let n = self.chars.len();
        let mut lines = Vec::new();
        if n == 0 {
            return lines;
        }
        let plain: String = self.chars.iter().map(|(c, _)| c).collect();
        let opps = compute_break_opportunities(&plain);

        let mut line_start = 0;
        let mut line_width = 0.0;
        let mut last_break: Option<usize> = None;

        let mut i = 0;
        while i < n {
            let ch = self.chars[i].0;
            if i > line_start {
                match opps[i] {
                    Some(BreakOpportunity::Mandatory) => {
                        lines.push(self.make_line(line_start, i, false, true));
                        line_start = i;
                        line_width = 0.0;
                        last_break = None;
                    }
                    Some(BreakOpportunity::Allowed) => last_break = Some(i),
                    None => {}
                }
            }
            if ch == SOFT_HYPHEN {
                last_break = Some(i + 1);
            }

            let w = self.widths[i];
            if let Some(max) = max_width {
                let overflowing = line_width + w > max + FIT_EPSILON && w > 0.0 && !ch.is_whitespace();
                if overflowing && i > line_start {
                    if let Some(bp) = last_break.filter(|&bp| bp > line_start) {
                        let soft = self.chars[bp - 1].0 == SOFT_HYPHEN;
                        lines.push(self.make_line(line_start, bp, soft, false));
                        line_start = bp;
                    } else if let Some(bp) = self.try_hyphenate(line_start, i, max) {
                        lines.push(self.make_line(line_start, bp, true, false));
                        line_start = bp;
                    } else {
                        lines.push(self.make_line(line_start, i, false, false));
                        line_start = i;
                    }
                    line_width = self.width_of(line_start, i);
                    last_break = None;
                    i += 1;
                    continue;
                }
            }
            line_width += w;
            i += 1;
        }

        if line_start < n {
            lines.push(self.make_line(line_start, n, false, true));
        }
        lines
    }
}

/// Break `text` into lines no wider than `max_width`. Without a width only
/// newlines break.
pub fn break_lines(text: &RichText, max_width: Option<f64>, fonts: &FontBook) -> Vec<Line> {
    Breaker::new(text, fonts).run(max_width)
}

/// Lay `text` into a `w` by `h` box: the leading lines whose heights sum to
/// at most `h`.
pub fn fit_lines(text: &RichText, w: f64, h: f64, fonts: &FontBook) -> Fit {
    let mut fit = Fit {
        lines: Vec::new(),
        consumed: 0,
        height: 0.0,
    };
    for line in break_lines(text, Some(w), fonts) {
        if fit.height + line.height > h + FIT_EPSILON {
            break;
        }
        fit.height += line.height;
        fit.consumed = line.end;
        fit.lines.push(line);
    }
    fit
}

/// Width of the widest line and the summed line heights.
pub fn measure(lines: &[Line]) -> (f64, f64) {
    lines.iter().fold((0.0f64, 0.0), |(w, h), line| (w.max(line.width), h + line.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn courier(text: &str, size: f64) -> RichText {
        let mut rt = RichText::new();
        rt.push(
            text,
            &TextAttributes {
                font_size: size,
                line_height: size * 1.5,
                ..Default::default()
            },
        );
        rt
    }

    #[test]
    fn test_single_line() {
        let book = FontBook::new();
        let lines = break_lines(&courier("hello world", 12.0), Some(1000.0), &book);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "hello world");
        assert!((lines[0].width - 79.2).abs() < 1e-9);
        assert!(lines[0].paragraph_end);
    }

    #[test]
    fn test_line_break_at_space() {
        let book = FontBook::new();
        let lines = break_lines(&courier("aaa bbb", 10.0), Some(40.0), &book);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "aaa ");
        assert!((lines[0].width - 18.0).abs() < 1e-9);
        assert_eq!(lines[1].text(), "bbb");
        assert_eq!(lines[1].start, 4);
        assert!(!lines[0].paragraph_end);
    }

    #[test]
    fn test_explicit_newline() {
        let book = FontBook::new();
        let lines = break_lines(&courier("ab\ncd", 10.0), None, &book);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "ab");
        assert_eq!(lines[0].end, 3);
        assert!(lines[0].paragraph_end);
        assert_eq!(lines[1].text(), "cd");
    }

    #[test]
    fn test_empty_text_has_no_lines() {
        let book = FontBook::new();
        assert!(break_lines(&RichText::new(), Some(100.0), &book).is_empty());
    }

    #[test]
    fn test_long_word_forced_break() {
        let book = FontBook::new();
        let lines = break_lines(&courier("abcdefghij", 10.0), Some(30.0), &book);
        let texts: Vec<String> = lines.iter().map(Line::text).collect();
        assert_eq!(texts, vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_hyphenation_breaks_long_word() {
        let book = FontBook::new();
        let mut rt = courier("extraordinary", 12.0);
        rt.hyphenation = true;
        let lines = break_lines(&rt, Some(50.0), &book);
        assert!(lines.len() >= 2, "got {} lines", lines.len());
        assert!(lines[0].text().ends_with('-'), "got '{}'", lines[0].text());
        let rejoined: String = lines
            .iter()
            .map(|l| l.text().trim_end_matches('-').to_string())
            .collect();
        assert_eq!(rejoined, "extraordinary");
    }

    #[test]
    fn test_fit_lines_stops_at_height() {
        let book = FontBook::new();
        // Size 10, line height 15: three lines fit in 45pt.
        let rt = courier("aaa bbb ccc ddd eee", 10.0);
        let fit = fit_lines(&rt, 24.0, 45.0, &book);
        assert_eq!(fit.lines.len(), 3);
        assert_eq!(fit.consumed, 12);
        assert!((fit.height - 45.0).abs() < 1e-9);
        assert_eq!(rt.slice_from(fit.consumed).plain_text(), "ddd eee");
    }

    #[test]
    fn test_fit_lines_nothing_fits() {
        let book = FontBook::new();
        let fit = fit_lines(&courier("word", 10.0), 100.0, 5.0, &book);
        assert!(fit.lines.is_empty());
        assert_eq!(fit.consumed, 0);
    }

    #[test]
    fn test_paragraph_spacing_on_last_line() {
        let book = FontBook::new();
        let mut rt = RichText::new();
        rt.push(
            "one\ntwo",
            &TextAttributes {
                font_size: 10.0,
                line_height: 12.0,
                paragraph_bottom_spacing: 4.0,
                ..Default::default()
            },
        );
        let lines = break_lines(&rt, Some(100.0), &book);
        assert!((lines[0].height - 16.0).abs() < 1e-9);
        assert!((lines[1].height - 16.0).abs() < 1e-9);
        assert!((measure(&lines).1 - 32.0).abs() < 1e-9);
    }
}
