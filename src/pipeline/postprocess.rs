//! Post-processing: deterministic cleanup of OCR transcriptions.
//!
//! Vision models occasionally wrap their reply in a code fence, use CRLF
//! line endings, or emit zero-width characters copied from the rendering.
//! None of that is document content, and all of it gets in the way of the
//! field parser's line-oriented patterns.
//!
//! ## Rule Order
//!
//! Line endings are normalised and a leading BOM removed before the fence
//! pattern runs, so it only has to handle `\n`. Trailing whitespace is
//! trimmed before blank lines are collapsed so lines holding only spaces
//! count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw transcription.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Strip an outer code fence
/// 4. Trim trailing whitespace per line
/// 5. Collapse runs of 2+ blank lines down to 1
/// 6. Trim leading and trailing blank lines
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_code_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```text\nPASSPORT\nJOHN DOE\n```";
        assert_eq!(strip_code_fences(input), "PASSPORT\nJOHN DOE");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        assert_eq!(strip_code_fences("```\nVISA\n```\n"), "VISA");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "POLICY NO 123\nValid until 01/02/2026";
        assert_eq!(strip_code_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "A12\u{200B}345678\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "A12345678");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
        // Two blank lines are already a run.
        assert_eq!(collapse_blank_lines("a\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_full_pipeline() {
        let input = "\u{FEFF}```\r\nPASSPORT   \r\n\r\n\r\n\r\nJOHN DOE\r\n```\r\n";
        assert_eq!(clean_ocr_text(input), "PASSPORT\n\nJOHN DOE");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_ocr_text("  \nINSURANCE\t\n\n\n\nPolicy 42  \n");
        assert_eq!(clean_ocr_text(&once), once);
    }
}
