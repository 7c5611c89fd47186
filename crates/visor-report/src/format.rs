//! # Report Text Cleanup
//!
//! The pathology system exports narrative fields as RTF fragments or as plain
//! text littered with RTF hex escapes, soft hyphens and zero-width
//! characters. These helpers turn that into clean NFC text and, for narrative
//! sections, into [`Block`]s the document template lays out.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use unicode_normalization::UnicodeNormalization;

/// RTF hex escapes for the Latin characters used in the source data.
const RTF_HEX: &[(&str, &str)] = &[
    (r"\'e1", "á"),
    (r"\'e9", "é"),
    (r"\'ed", "í"),
    (r"\'f3", "ó"),
    (r"\'fa", "ú"),
    (r"\'c1", "Á"),
    (r"\'c9", "É"),
    (r"\'cd", "Í"),
    (r"\'d3", "Ó"),
    (r"\'da", "Ú"),
    (r"\'f1", "ñ"),
    (r"\'d1", "Ñ"),
    (r"\'fc", "ü"),
    (r"\'dc", "Ü"),
    (r"\'bf", "¿"),
    (r"\'a1", "¡"),
    (r"\'b0", "°"),
];

/// Techniques shown per row in the rendered report.
pub const TECHNIQUES_PER_ROW: usize = 4;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")))
}

fn rtf_group() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\{\\.*?\}")
}

fn rtf_par() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\\par\b")
}

fn rtf_control_word() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\\[a-z]+\d*")
}

fn horizontal_runs() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"[ \t]{2,}")
}

fn bullet_marker() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"^-\s+")
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}')
}

/// Drop soft hyphens and zero-width characters, turn NBSP into a space,
/// collapse runs of spaces and tabs, and compose to NFC.
fn scrub(text: &str) -> String {
    let visible: String = text
        .chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect();
    let collapsed = horizontal_runs().replace_all(&visible, " ");
    (&*collapsed).nfc().collect()
}

/// Decode RTF hex escapes, remove invisible characters and compose to NFC.
pub fn decode_rtf_hex(text: &str) -> String {
    let mut out = text.to_owned();
    for (escape, ch) in RTF_HEX {
        if out.contains(escape) {
            out = out.replace(escape, ch);
        }
    }
    out.chars()
        .filter(|c| !is_invisible(*c))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .nfc()
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Whether `text` is a whole RTF document rather than plain text.
pub fn is_rtf(text: &str) -> bool {
    text.trim_start().starts_with(r"{\rtf")
}

/// Reduce an RTF fragment or document to plain text, keeping paragraph
/// breaks.
pub fn strip_rtf(text: &str) -> String {
    let decoded = decode_rtf_hex(text);
    let body = if is_rtf(&decoded) {
        let inner = decoded.trim().trim_start_matches('{');
        inner.strip_suffix('}').unwrap_or(inner)
    } else {
        decoded.as_str()
    };
    let without_groups = rtf_group().replace_all(body, "");
    let with_breaks = rtf_par().replace_all(&without_groups, "\n");
    let without_words = rtf_control_word().replace_all(&with_breaks, "");
    let without_braces: String = without_words
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect();
    scrub(&without_braces)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Clean a single-line field: line breaks become spaces.
pub fn clean_inline(text: &str) -> String {
    let decoded = if text.contains(r"\'") {
        decode_rtf_hex(text)
    } else {
        text.to_owned()
    };
    let flat = decoded.trim().replace('\r', "").replace('\n', " ");
    scrub(&flat)
}

/// Clean a narrative field: line breaks are normalized to `\n` and kept.
/// Whole RTF documents go through [`strip_rtf`].
pub fn clean_narrative(text: &str) -> String {
    if is_rtf(text) {
        return strip_rtf(text);
    }
    let decoded = if text.contains(r"\'") {
        decode_rtf_hex(text)
    } else {
        text.to_owned()
    };
    let normalized = decoded.trim().replace("\r\n", "\n").replace('\r', "\n");
    scrub(&normalized)
}

/// One layout block of a narrative section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// A plain line of text.
    Paragraph { text: String },
    /// Consecutive `- ` lines.
    List { items: Vec<String> },
}

/// Split narrative text into blocks.
///
/// Consecutive lines starting with `- ` form one list; every other
/// non-empty line becomes a paragraph. Blank lines are dropped.
pub fn to_bullets(text: &str) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();

    for line in text.lines().map(str::trim) {
        if bullet_marker().is_match(line) {
            let item = bullet_marker().replace(line, "").into_owned();
            match blocks.last_mut() {
                Some(Block::List { items }) => items.push(item),
                _ => blocks.push(Block::List { items: vec![item] }),
            }
        } else if !line.is_empty() {
            blocks.push(Block::Paragraph {
                text: line.to_owned(),
            });
        }
    }

    blocks
}

/// Trim, drop blanks and duplicates, and split into rows of
/// [`TECHNIQUES_PER_ROW`].
pub fn group_techniques(techniques: &[String]) -> Vec<Vec<String>> {
    let mut distinct: Vec<String> = Vec::new();
    for technique in techniques.iter().map(|t| t.trim()) {
        if !technique.is_empty() && !distinct.iter().any(|d| d == technique) {
            distinct.push(technique.to_owned());
        }
    }
    distinct
        .chunks(TECHNIQUES_PER_ROW)
        .map(<[String]>::to_vec)
        .collect()
}
