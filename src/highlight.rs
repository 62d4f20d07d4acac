//! Underlining of べき (obligation) expressions in Japanese text.

use regex::Regex;
use std::sync::LazyLock;

// Alternatives are ordered longest first; the regex engine takes the first
// alternative that matches at a position.
const BEKI_PATTERN: &str = "(?:する|す)?べき(?:ではありません|ではない|じゃない|でない|ではなく|であった|である|でした|です|だった|だろう|だ|こと|もの|なのは|な)?";

static BEKI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BEKI_PATTERN).expect("BEKI_PATTERN is a valid regex"));

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// HTML-escape `text` and wrap every べき expression in `<u>`.
pub fn underline_beki(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in BEKI.find_iter(text) {
        out.push_str(&escape_html(&text[last..m.start()]));
        out.push_str("<u>");
        out.push_str(&escape_html(m.as_str()));
        out.push_str("</u>");
        last = m.end();
    }
    out.push_str(&escape_html(&text[last..]));
    out
}

pub fn count_matches(text: &str) -> usize {
    BEKI.find_iter(text).count()
}

pub fn matched_phrases(text: &str) -> Vec<&str> {
    BEKI.find_iter(text).map(|m| m.as_str()).collect()
}

/// A standalone UTF-8 page with the underlined text, for saving to disk.
pub fn render_html(title: &str, text: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"ja\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{}</title>\n\
         <style>body {{ font-family: sans-serif; line-height: 1.8; white-space: pre-wrap; }} \
         u {{ text-decoration-color: #d33; text-decoration-thickness: 2px; }}</style>\n\
         </head>\n\
         <body>{}</body>\n\
         </html>\n",
        escape_html(title),
        underline_beki(text)
    )
}
