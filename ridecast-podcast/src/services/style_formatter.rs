//! Narration markup for generated scripts
//!
//! The synthesis worker reads a plain-text script where every paragraph
//! carries a speaker cue, `*word*` marks emphasis, and a standalone
//! `[pause]` line separates paragraphs. This module turns a draft into that
//! shape. It is a best-effort enhancement, never a validator: anything it
//! does not understand passes through as-is.
//!
//! Formatting is idempotent: formatting an already formatted script
//! returns it unchanged.

use crate::models::{DraftScript, FormattedScript};

/// Default speaker cue for paragraphs without one
pub const NARRATOR_CUE: &str = "Narrator:";

/// Standalone paragraph separator understood by the worker
pub const PAUSE_MARKER: &str = "[pause]";

/// Longest speaker label, in words
const MAX_CUE_WORDS: usize = 2;

/// Format a draft for narration
pub fn format_script(draft: &DraftScript) -> FormattedScript {
    FormattedScript::new(format_text(draft.as_str()))
}

/// Format raw script text for narration
pub fn format_text(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    split_paragraphs(text)
        .into_iter()
        .map(|paragraph| add_speaker_cue(&convert_emphasis(&paragraph)))
        .collect::<Vec<_>>()
        .join(&format!("\n\n{}\n\n", PAUSE_MARKER))
}

/// Paragraphs split on blank lines and pause markers
///
/// Lines inside a paragraph are joined with single spaces. Markdown headings
/// become their own paragraph as a plain sentence.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    fn flush(current: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
        if !current.is_empty() {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    }

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line == PAUSE_MARKER {
            flush(&mut current, &mut paragraphs);
            continue;
        }
        if line.starts_with('#') {
            flush(&mut current, &mut paragraphs);
            if let Some(sentence) = heading_sentence(line) {
                paragraphs.push(sentence);
            }
            continue;
        }
        current.push(line);
    }
    flush(&mut current, &mut paragraphs);

    paragraphs
}

/// "## Your strengths" → "Your strengths."
fn heading_sentence(line: &str) -> Option<String> {
    let title = line.trim_start_matches('#').trim();
    if title.is_empty() {
        return None;
    }
    if title.ends_with(|c: char| matches!(c, '.' | '!' | '?' | ':')) {
        Some(title.to_string())
    } else {
        Some(format!("{}.", title))
    }
}

/// `**x**` / `__x__` → `*x*`
///
/// Repeats until nothing changes, so nested markers such as `__**x**__`
/// collapse fully. Every productive pass shortens the text.
fn convert_emphasis(paragraph: &str) -> String {
    let mut text = paragraph.to_string();
    loop {
        let next = convert_emphasis_once(&text);
        if next == text {
            return text;
        }
        text = next;
    }
}

/// One pass over both markers
///
/// Unbalanced markers or runs of three or more leave the text untouched.
fn convert_emphasis_once(text: &str) -> String {
    if text.contains("***") || text.contains("___") {
        return text.to_string();
    }

    let mut converted = text.to_string();
    for marker in ["**", "__"] {
        match replace_marker_pairs(&converted, marker) {
            Some(next) => converted = next,
            None => return text.to_string(),
        }
    }
    converted
}

fn replace_marker_pairs(text: &str, marker: &str) -> Option<String> {
    if text.matches(marker).count() % 2 != 0 {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find(marker) {
        let after_open = &rest[open + marker.len()..];
        let close = after_open.find(marker)?;
        let inner = &after_open[..close];
        if inner.trim().is_empty() {
            return None;
        }
        out.push_str(&rest[..open]);
        out.push('*');
        out.push_str(inner);
        out.push('*');
        rest = &after_open[close + marker.len()..];
    }
    out.push_str(rest);
    Some(out)
}

/// `Word: ` or `Two Words: ` at the start of a paragraph
///
/// The first word starts with an uppercase letter; words are letters,
/// digits, hyphens and apostrophes ("Co-host:", "Speaker 2:").
fn has_speaker_cue(paragraph: &str) -> bool {
    let Some((label, remainder)) = paragraph.split_once(':') else {
        return false;
    };
    if !remainder.starts_with(' ') && !remainder.is_empty() {
        return false;
    }

    let words: Vec<&str> = label.split(' ').collect();
    if words.len() > MAX_CUE_WORDS {
        return false;
    }
    let word_ok = |w: &str| {
        !w.is_empty()
            && w.chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '\'')
    };
    words.iter().copied().all(word_ok)
        && label.chars().next().is_some_and(|c| c.is_uppercase())
}

fn add_speaker_cue(paragraph: &str) -> String {
    if has_speaker_cue(paragraph) {
        paragraph.to_string()
    } else {
        format!("{} {}", NARRATOR_CUE, paragraph)
    }
}
