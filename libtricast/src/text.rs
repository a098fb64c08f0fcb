//! Text cleanup and URL extraction
//!
//! Pure text transforms shared by the publishers: URL extraction with the
//! embed retention limits, whitespace normalization in the two flavors the
//! platforms need, and the Bluesky line-break formatting.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// At most this many URLs are kept for embed slots.
pub const MAX_URLS: usize = 2;

/// URLs longer than this (UTF-8 bytes) are dropped from the retained list.
pub const MAX_URL_BYTES: usize = 256;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("valid URL pattern"));

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid blank-run pattern"));

static NEWLINE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline-run pattern"));

/// Whitespace handling for the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    /// Collapse all whitespace runs to single spaces.
    Collapse,
    /// Keep line structure: normalize line endings, collapse runs of blank
    /// lines to one, right-trim each line.
    PreserveLines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedText {
    pub text: String,
    /// Retained URLs in order of first appearance.
    pub urls: Vec<String>,
}

/// Extract URLs from `text` and strip them from the content.
///
/// Every match is removed from the text, but only the first [`MAX_URLS`]
/// matches of at most [`MAX_URL_BYTES`] UTF-8 bytes are retained for embeds.
/// Deterministic and idempotent on its own output.
pub fn clean_text(text: &str, mode: Whitespace) -> CleanedText {
    let matches: Vec<&str> = URL_RE.find_iter(text).map(|m| m.as_str()).collect();

    let urls: Vec<String> = matches
        .iter()
        .filter(|url| url.len() <= MAX_URL_BYTES)
        .take(MAX_URLS)
        .map(|url| url.to_string())
        .collect();

    if urls.len() < matches.len() {
        warn!(
            kept = urls.len(),
            found = matches.len(),
            "dropped URLs over the retention limits"
        );
    }

    let stripped = URL_RE.replace_all(text, "");

    let cleaned = match mode {
        Whitespace::Collapse => stripped.split_whitespace().collect::<Vec<_>>().join(" "),
        Whitespace::PreserveLines => {
            let unified = stripped.replace("\r\n", "\n").replace('\r', "\n");
            let collapsed = BLANK_RUN_RE.replace_all(&unified, "\n\n");
            collapsed
                .lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    CleanedText {
        text: cleaned.trim().to_string(),
        urls,
    }
}

/// Format text for Bluesky: normalize line endings, collapse three or more
/// consecutive newlines to exactly two, right-trim each line, trim overall.
pub fn bluesky_format(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = NEWLINE_RUN_RE.replace_all(&unified, "\n\n");
    collapsed
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_and_retains_urls() {
        let cleaned = clean_text(
            "check https://example.com/a and www.example.org too",
            Whitespace::Collapse,
        );
        assert_eq!(cleaned.text, "check and too");
        assert_eq!(
            cleaned.urls,
            vec!["https://example.com/a", "www.example.org"]
        );
    }

    #[test]
    fn retains_at_most_two_urls_but_strips_all() {
        let cleaned = clean_text(
            "a https://one.example b https://two.example c https://three.example d",
            Whitespace::Collapse,
        );
        assert_eq!(cleaned.urls.len(), 2);
        assert_eq!(cleaned.urls[0], "https://one.example");
        assert_eq!(cleaned.urls[1], "https://two.example");
        assert!(!cleaned.text.contains("three.example"));
        assert_eq!(cleaned.text, "a b c d");
    }

    #[test]
    fn oversized_url_is_dropped_but_still_stripped() {
        let long_url = format!("https://x.co/{}", "a".repeat(300));
        assert!(long_url.len() > MAX_URL_BYTES);
        let input = format!("Hello {} https://x.co/s world", long_url);

        let cleaned = clean_text(&input, Whitespace::Collapse);
        assert_eq!(cleaned.urls, vec!["https://x.co/s"]);
        assert_eq!(cleaned.text, "Hello world");
    }

    #[test]
    fn url_exactly_at_byte_limit_is_kept() {
        let url = format!("https://x.co/{}", "a".repeat(MAX_URL_BYTES - 13));
        assert_eq!(url.len(), MAX_URL_BYTES);
        let cleaned = clean_text(&url, Whitespace::Collapse);
        assert_eq!(cleaned.urls, vec![url]);
    }

    #[test]
    fn collapse_mode_flattens_whitespace() {
        let cleaned = clean_text("a\t b\n\n  c", Whitespace::Collapse);
        assert_eq!(cleaned.text, "a b c");
    }

    #[test]
    fn preserve_lines_keeps_structure() {
        let cleaned = clean_text(
            "first line  \r\nsecond\r\n\r\n\r\nthird",
            Whitespace::PreserveLines,
        );
        assert_eq!(cleaned.text, "first line\nsecond\n\nthird");
    }

    #[test]
    fn clean_text_is_idempotent() {
        let inputs = [
            "plain text",
            "multi  space \t and https://example.com link",
            "lines\r\none\r\n\r\n\r\ntwo  ",
            "www.example.com only",
        ];
        for input in inputs {
            for mode in [Whitespace::Collapse, Whitespace::PreserveLines] {
                let once = clean_text(input, mode);
                let twice = clean_text(&once.text, mode);
                assert_eq!(once.text, twice.text, "not a fixed point: {input:?}");
                assert!(twice.urls.is_empty(), "urls survived stripping: {input:?}");
            }
        }
    }

    #[test]
    fn bluesky_format_collapses_newline_runs() {
        assert_eq!(
            bluesky_format("a\n\n\n\nb"),
            "a\n\nb",
            "3+ newlines collapse to exactly two"
        );
        assert_eq!(bluesky_format("a\n\nb"), "a\n\nb");
        assert_eq!(bluesky_format("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn bluesky_format_trims_lines_and_ends() {
        assert_eq!(bluesky_format("  a  \nb  \n"), "a\nb");
    }
}
