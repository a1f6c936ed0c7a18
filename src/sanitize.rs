//! Markup-to-plain-text normalization for feed item bodies.
//!
//! Every step tolerates malformed markup: unmatched or truncated tags are
//! dropped silently, and each transformation is idempotent on its own
//! output.

use regex::Regex;
use std::sync::LazyLock;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").unwrap());
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static BLOCK_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(?:p|div|h[1-6]|li)>|<br\s*/?>").unwrap());
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s+[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap()
});
static IMG_ALT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\s+[^>]*?alt="([^"]*)"[^>]*?>"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce a possibly HTML-bearing body to clean plain text.
pub fn clean_content(raw: &str, strip_html: bool) -> String {
    let mut text = CDATA_RE.replace_all(raw, "$1").into_owned();

    if strip_html && text.contains('<') {
        text = SCRIPT_RE.replace_all(&text, " ").into_owned();
        text = STYLE_RE.replace_all(&text, " ").into_owned();
        text = COMMENT_RE.replace_all(&text, " ").into_owned();
        // Preserve paragraph structure before tags disappear.
        text = BLOCK_CLOSE_RE.replace_all(&text, "\n").into_owned();
        // Keep link text together with its target, and image alt text.
        text = ANCHOR_RE.replace_all(&text, "$2 $1").into_owned();
        text = IMG_ALT_RE.replace_all(&text, "$1").into_owned();
        text = TAG_RE.replace_all(&text, " ").into_owned();
    }

    text = decode_entities(&text);
    WS_RE.replace_all(&text, " ").trim().to_string()
}

/// Decode the handful of entities that actually occur in the configured
/// feeds. Anything rarer passes through untouched.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\u{201c}")
        .replace("&rdquo;", "\u{201d}")
        .replace("&amp;", "&")
}

/// Char-exact prefix, safe for CJK text.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Truncate to `max_chars` with a `...` marker counted inside the budget.
/// Text already within the budget is returned unchanged.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", truncate_chars(text, keep))
}

/// Truncate at a sentence boundary within `max_chars`, preferring CJK
/// terminal punctuation, then ASCII. Falls back to a hard cut when no
/// boundary lands past `min_chars`.
pub fn sentence_bounded_truncate(text: &str, max_chars: usize, min_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    let window = &chars[..max_chars];

    let last_pos = |marks: &[char]| {
        window
            .iter()
            .enumerate()
            .rev()
            .find(|(_, c)| marks.contains(c))
            .map(|(i, _)| i)
    };

    let cut = last_pos(&['。', '？', '！'])
        .filter(|&i| i >= min_chars)
        .or_else(|| last_pos(&['.', '?', '!']).filter(|&i| i >= min_chars));

    match cut {
        Some(i) => window[..=i].iter().collect(),
        None => window.iter().collect(),
    }
}

/// Append a full stop when the text does not already end in terminal
/// punctuation, so condensed bodies read as complete statements.
pub fn ensure_terminal_punct(text: &str) -> String {
    match text.chars().last() {
        Some('。') | Some('？') | Some('！') | Some('.') | Some('?') | Some('!') => {
            text.to_string()
        }
        _ => format!("{}。", text),
    }
}
