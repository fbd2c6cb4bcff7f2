use std::sync::LazyLock;

use regex::Regex;

static SRT_TIMING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3} --> .*").expect("valid regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*\n+").expect("valid regex"));

/// Strip subtitle timing lines and markup from a meeting transcript and
/// collapse blank lines.
pub fn clean_transcript(raw: &str) -> String {
    let text = SRT_TIMING.replace_all(raw, "");
    let text = TAG.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n");
    text.trim().to_string()
}
