//! Post-processing: deterministic cleanup of VLM transcripts.
//!
//! Even with "plain text only" in the prompt, models wrap answers in fences,
//! emit Markdown emphasis or leave zero-width characters around digits. Each
//! of those breaks a downstream regex (a ZWSP inside `1234 5678 9012` hides
//! the ID).
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw answer; invisible characters go before whitespace trimming.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to one transcript.
///
/// Rules (applied in order):
/// 1. Strip outer code fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Drop Markdown emphasis and heading markers
/// 5. Trim each line and drop blank lines
pub fn clean_transcript(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = strip_markdown_markers(&s);
    drop_blank_lines(&s)
}

/// Join per-page transcripts in page order.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Drop Markdown markers ────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+").unwrap());
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__").unwrap());

fn strip_markdown_markers(input: &str) -> String {
    let s = RE_HEADING.replace_all(input, "");
    RE_EMPHASIS.replace_all(&s, "").to_string()
}

// ── Rule 5: Trim lines, drop blanks ──────────────────────────────────────────

fn drop_blank_lines(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
