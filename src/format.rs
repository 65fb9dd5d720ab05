//! Slack formatting for raw model replies.
//!
//! [`format_for_slack`] never fails and is idempotent: formatting an already
//! formatted reply returns it unchanged. The result always begins with exactly
//! one category emoji from [`CATEGORY_EMOJI`].

use std::sync::OnceLock;

use regex::{Captures, Regex};

pub const CODE_EMOJI: &str = "💻";
pub const ERROR_EMOJI: &str = "🐛";
pub const OPTIMIZE_EMOJI: &str = "⚡";
pub const GENERIC_EMOJI: &str = "🤖";

pub const CATEGORY_EMOJI: [&str; 4] = [CODE_EMOJI, ERROR_EMOJI, OPTIMIZE_EMOJI, GENERIC_EMOJI];

/// Labels models like to open with. At most one is removed.
const LEADING_LABELS: [&str; 6] = ["Response:", "Assistant:", "AI:", "Bot:", "Here's", "Here is"];

/// Keyword groups in priority order; the first group with a hit picks the emoji.
const CATEGORIES: [(&[&str], &str); 3] = [
    (&["code", "function", "class", "method", "variable"], CODE_EMOJI),
    (&["error", "bug", "issue", "problem"], ERROR_EMOJI),
    (&["optimize", "improve", "better", "performance"], OPTIMIZE_EMOJI),
];

fn code_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```(\w+)?[ \t]*\n(.*?)\n[ \t]*```").expect("code block pattern is valid")
    })
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)```.*?```").expect("fence pattern is valid"))
}

fn inline_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"`([^`\n]+)`").expect("inline code pattern is valid"))
}

/// Format a raw model reply for a Slack message.
pub fn format_for_slack(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = strip_leading_label(trimmed);
    let body = strip_category_emoji(body);
    let body = normalize_code_blocks(body);
    let body = normalize_inline_code(&body);
    compose(category_emoji(trimmed), &body)
}

fn compose(emoji: &str, body: &str) -> String {
    if body.is_empty() {
        emoji.to_string()
    } else {
        format!("{emoji} {body}")
    }
}

/// Drop every category emoji the text already opens with, along with
/// variation selectors and the whitespace after them.
fn strip_category_emoji(text: &str) -> &str {
    let mut rest = text;
    while let Some(tail) = CATEGORY_EMOJI
        .iter()
        .find_map(|emoji| rest.strip_prefix(emoji))
    {
        rest = tail.trim_start_matches('\u{fe0f}').trim_start();
    }
    rest
}

/// Remove the first matching label, if the text starts with one.
pub fn strip_leading_label(text: &str) -> &str {
    LEADING_LABELS
        .iter()
        .find_map(|label| text.strip_prefix(label))
        .map(str::trim)
        .unwrap_or(text)
}

/// Re-emit fenced blocks as ```` ```lang\n...\n``` ````, keeping the
/// language tag and the block content as-is.
pub fn normalize_code_blocks(text: &str) -> String {
    code_block_pattern()
        .replace_all(text, "```${1}\n${2}\n```")
        .into_owned()
}

/// Trim padding inside `inline code` spans outside fenced blocks.
pub fn normalize_inline_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for fence in fence_pattern().find_iter(text) {
        out.push_str(&trim_inline_spans(&text[last..fence.start()]));
        out.push_str(fence.as_str());
        last = fence.end();
    }
    out.push_str(&trim_inline_spans(&text[last..]));
    out
}

fn trim_inline_spans(text: &str) -> String {
    inline_code_pattern()
        .replace_all(text, |caps: &Captures| {
            let inner = caps[1].trim();
            if inner.is_empty() {
                caps[0].to_string()
            } else {
                format!("`{inner}`")
            }
        })
        .into_owned()
}

/// Emoji for the first keyword group found in `text` (case-insensitive).
pub fn category_emoji(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, emoji)| *emoji)
        .unwrap_or(GENERIC_EMOJI)
}
