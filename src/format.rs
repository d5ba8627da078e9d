//! Plain-text shaping of assistant replies.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s+").expect("valid regex"));
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[*-][ \t]+").expect("valid regex"));
static ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\d+\.[ \t]+").expect("valid regex"));
static CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("valid regex"));
static TRAILING_JUNK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,!?;:)\]]+$").expect("valid regex"));

const TERMINAL: [char; 3] = ['.', '!', '?'];

/// Strip elementary markdown so a reply reads as plain prose.
///
/// Bullets become `• `, ordered-list numbers and header hashes are dropped,
/// emphasis markers are removed and whitespace is normalized. Already clean
/// text comes back unchanged.
pub fn format_message(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let formatted = BOLD.replace_all(text, "$1");
    let formatted = HEADER.replace_all(&formatted, "");
    let formatted = BULLET.replace_all(&formatted, "• ");
    let formatted = ORDERED.replace_all(&formatted, "");
    let formatted = ITALIC.replace_all(&formatted, "$1");
    let formatted = CONTROL.replace_all(&formatted, "");
    let formatted = BLANK_LINES.replace_all(&formatted, "\n\n");
    let formatted = SPACES.replace_all(&formatted, " ");
    let formatted = formatted.trim();
    TRAILING_JUNK.replace(formatted, "").trim_end().to_string()
}

/// Drop a corrupted trailing fragment left by the upstream model.
///
/// Text is split at the last sentence boundary (`.`, `!` or `?` followed by
/// whitespace, or a line break). The final fragment is dropped when it lacks
/// terminal punctuation and is either shorter than three characters or a
/// single unbroken run of eight or more letters. This is a heuristic: a
/// legitimate short or single-word closing line can be cut.
pub fn clean_trailing_fragment(text: &str) -> String {
    let trimmed = text.trim_end();
    let Some(cut) = last_sentence_boundary(trimmed) else {
        return trimmed.to_string();
    };

    let (head, tail) = trimmed.split_at(cut);
    let tail = tail.trim();
    if tail.is_empty() || !looks_corrupted(tail) {
        return trimmed.to_string();
    }

    let mut kept = head.trim_end().to_string();
    if !kept.is_empty() && !kept.ends_with(TERMINAL) {
        kept.push('.');
    }
    kept
}

fn last_sentence_boundary(text: &str) -> Option<usize> {
    let mut boundary = None;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let next_is_space = chars.peek().is_some_and(|(_, next)| next.is_whitespace());
        if c == '\n' {
            boundary = Some(idx);
        } else if TERMINAL.contains(&c) && next_is_space {
            boundary = Some(idx + c.len_utf8());
        }
    }
    boundary
}

fn looks_corrupted(fragment: &str) -> bool {
    if fragment.ends_with(TERMINAL) {
        return false;
    }
    let len = fragment.chars().count();
    if len < 3 {
        return true;
    }
    len >= 8 && fragment.chars().all(char::is_alphabetic)
}
