use std::borrow::Cow;

use chrono::{DateTime, Utc};

/// Returns true for bytes that must not survive into stored single-line fields.
///
/// Tab, newline and carriage return are kept; everything else below 0x20 and
/// DEL is dropped.
fn is_stripped_byte(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && b != 0x09 && b != 0x0a && b != 0x0d)
}

/// Strip ASCII control characters from user-supplied text.
///
/// Applied to titles, authors, categories and other admin form fields before
/// they reach the database. Tab, newline and carriage return are preserved.
///
/// Returns `Cow::Borrowed` when the input is already clean (the common case).
///
/// # Examples
///
/// ```
/// use gazette::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("clean title"), "clean title");
/// assert_eq!(strip_control_chars("bad\x00title\x07"), "badtitle");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(is_stripped_byte) {
        return Cow::Borrowed(s);
    }

    // Control bytes are ASCII and never appear mid-codepoint, so filtering
    // chars is equivalent to filtering bytes here.
    Cow::Owned(
        s.chars()
            .filter(|c| !(c.is_ascii() && is_stripped_byte(*c as u8)))
            .collect(),
    )
}

/// Flatten user input into one line.
///
/// Control characters are stripped and every whitespace run, line breaks and
/// tabs included, becomes a single space. The result is trimmed.
///
/// # Examples
///
/// ```
/// use gazette::util::to_single_line;
///
/// assert_eq!(to_single_line("  Ama\r\n  Owusu\t"), "Ama Owusu");
/// ```
pub fn to_single_line(s: &str) -> String {
    strip_control_chars(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape text for inclusion in HTML element content or a quoted attribute.
///
/// Escapes `&`, `<`, `>`, `"` and `'`. Returns `Cow::Borrowed` when nothing
/// needs escaping.
///
/// # Examples
///
/// ```
/// use gazette::util::escape_html;
///
/// assert_eq!(escape_html("Fish & Chips"), "Fish &amp; Chips");
/// assert_eq!(escape_html("plain"), "plain");
/// ```
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\'')) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Format a unix timestamp as a long-form publication date, e.g. "March 15, 2024".
///
/// Out-of-range timestamps fall back to the unix epoch rather than failing.
pub fn format_publication_date(timestamp: i64) -> String {
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default();
    date.format("%B %-d, %Y").to_string()
}
