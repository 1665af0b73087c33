//! Placeholder and bare-URL tokenizer for raw article bodies.
//!
//! Recognized spans, in priority order at any position:
//!
//! 1. Indexed placeholders: `[IMAGE:3]`, `[VIDEO:0]`
//! 2. Generic placeholders: `[IMAGE: a sunset]`, `[video: keynote]`
//! 3. Bare `http`/`https` URLs
//!
//! Everything else is plain text. Malformed bracket syntax never errors; it
//! simply stays text. Input that already contains markup tags is not parsed
//! at all and comes back as a single [`SpanKind::PassThrough`] span.

use std::ops::Range;

use url::Url;

/// Media kind declared by a placeholder label or inferred from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Match a placeholder label (`IMAGE` / `VIDEO`), ASCII case-insensitively.
    fn from_label(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("IMAGE") {
            Some(Self::Image)
        } else if label.eq_ignore_ascii_case("VIDEO") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// What a span of the source text is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    /// Plain text, to be paragraph-wrapped.
    Text,
    /// `[IMAGE:n]` / `[VIDEO:n]`: explicit media-reference list position.
    IndexedMedia { kind: MediaKind, index: usize },
    /// `[IMAGE: description]`: bound to the `ordinal`-th media reference.
    ///
    /// `ordinal` counts generic placeholders only, independent of any
    /// indexed placeholders that precede it.
    GenericMedia { kind: MediaKind, ordinal: usize },
    /// An absolute `http`/`https` URL found in running text.
    BareUrl,
    /// The whole input, left untouched because it already contains markup.
    PassThrough,
}

/// A typed slice of the source, identified by its byte range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

/// Result of tokenizing one article body.
///
/// The spans are in document order and cover the source exactly once, with no
/// gaps or overlaps.
#[derive(Debug, Clone)]
pub struct ParsedBody<'a> {
    source: &'a str,
    spans: Vec<Span>,
}

impl<'a> ParsedBody<'a> {
    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// The source text covered by `span`.
    pub fn text(&self, span: &Span) -> &'a str {
        &self.source[span.range.clone()]
    }

    /// The free-text description of a generic placeholder, trimmed.
    ///
    /// Returns `None` for every other span kind.
    pub fn description(&self, span: &Span) -> Option<&'a str> {
        if !matches!(span.kind, SpanKind::GenericMedia { .. }) {
            return None;
        }
        let raw = self.text(span);
        let inner = &raw[1..raw.len() - 1];
        inner.split_once(':').map(|(_, desc)| desc.trim())
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(
            self.spans.first(),
            Some(Span {
                kind: SpanKind::PassThrough,
                ..
            })
        )
    }
}

/// Returns true when the text contains something shaped like an HTML tag.
///
/// A tag is `<`, an optional `/`, an ASCII letter, then anything up to `>`
/// that contains no `<` and no newline. `a < b` and `x<3` do not count.
pub fn looks_like_markup(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(offset) = bytes[i..].iter().position(|&b| b == b'<') {
        let open = i + offset;
        let mut j = open + 1;
        if bytes.get(j) == Some(&b'/') {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_alphabetic) {
            for &b in &bytes[j + 1..] {
                match b {
                    b'>' => return true,
                    b'<' | b'\n' => break,
                    _ => {}
                }
            }
        }
        i = open + 1;
    }
    false
}

/// Tokenize a raw article body.
pub fn parse(source: &str) -> ParsedBody<'_> {
    if looks_like_markup(source) {
        return ParsedBody {
            source,
            spans: vec![Span {
                kind: SpanKind::PassThrough,
                range: 0..source.len(),
            }],
        };
    }

    let mut spans = Vec::new();
    let mut generic_cursor = 0usize;
    let mut text_start = 0usize;
    let mut pos = 0usize;

    while pos < source.len() {
        let rest = &source[pos..];
        let matched = match rest.as_bytes()[0] {
            b'[' => match_placeholder(rest).map(|(len, kind)| {
                let kind = match kind {
                    Placeholder::Indexed(kind, index) => SpanKind::IndexedMedia { kind, index },
                    Placeholder::Generic(kind) => {
                        let ordinal = generic_cursor;
                        generic_cursor += 1;
                        SpanKind::GenericMedia { kind, ordinal }
                    }
                };
                (len, kind)
            }),
            b'h' | b'H' if can_start_url(&source[..pos]) => {
                match_bare_url(rest).map(|len| (len, SpanKind::BareUrl))
            }
            _ => None,
        };

        match matched {
            Some((len, kind)) => {
                if text_start < pos {
                    spans.push(Span {
                        kind: SpanKind::Text,
                        range: text_start..pos,
                    });
                }
                spans.push(Span {
                    kind,
                    range: pos..pos + len,
                });
                pos += len;
                text_start = pos;
            }
            None => {
                // Advance one full character to stay on a char boundary.
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if text_start < source.len() {
        spans.push(Span {
            kind: SpanKind::Text,
            range: text_start..source.len(),
        });
    }

    ParsedBody { source, spans }
}

enum Placeholder {
    Indexed(MediaKind, usize),
    Generic(MediaKind),
}

/// Placeholders longer than this are text. Keeps the bracket scan bounded.
const MAX_PLACEHOLDER_LEN: usize = 512;

/// Bare URLs longer than this are text.
const MAX_URL_LEN: usize = 2048;

/// Try to match a placeholder at the start of `rest` (which begins with `[`).
///
/// Returns the byte length of the placeholder, including both brackets.
fn match_placeholder(rest: &str) -> Option<(usize, Placeholder)> {
    // Neither form may contain `[` or a newline, so the scan stops at the
    // first of those as well as at `]`.
    let bytes = rest.as_bytes();
    let window = &bytes[1..bytes.len().min(MAX_PLACEHOLDER_LEN)];
    let close = 1 + window
        .iter()
        .position(|&b| matches!(b, b']' | b'[' | b'\n'))?;
    if bytes[close] != b']' {
        return None;
    }

    let inner = &rest[1..close];
    let (label, body) = inner.split_once(':')?;
    let kind = MediaKind::from_label(label)?;

    if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
        // Overflowing indices are not placeholders.
        let index = body.parse::<usize>().ok()?;
        return Some((close + 1, Placeholder::Indexed(kind, index)));
    }

    body.starts_with(char::is_whitespace)
        .then_some((close + 1, Placeholder::Generic(kind)))
}

/// Characters that end a bare URL.
fn is_url_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '<' | '>' | '"' | '\'' | '[' | ']')
}

/// A bare URL starts at the beginning of the input, after whitespace, or
/// after an opening delimiter. `foohttps://...` is text.
fn can_start_url(before: &str) -> bool {
    before.chars().next_back().map_or(true, |c| {
        c.is_whitespace() || matches!(c, '(' | '[' | ']' | '<' | '>' | '"' | '\'')
    })
}

/// Try to match a bare absolute URL at the start of `rest`.
///
/// Trailing sentence punctuation is not part of the URL. Candidates that do
/// not parse as a URL with a host are rejected.
fn match_bare_url(rest: &str) -> Option<usize> {
    let scheme_len = if starts_with_ignore_case(rest, "https://") {
        8
    } else if starts_with_ignore_case(rest, "http://") {
        7
    } else {
        return None;
    };

    let end = rest
        .char_indices()
        .find(|&(i, c)| i >= MAX_URL_LEN || is_url_terminator(c))
        .map_or(rest.len(), |(i, _)| i);
    if end >= MAX_URL_LEN {
        return None;
    }

    let candidate = trim_trailing_punctuation(&rest[..end]);
    if candidate.len() <= scheme_len {
        return None;
    }

    let url = Url::parse(candidate).ok()?;
    url.host_str().filter(|h| !h.is_empty())?;
    Some(candidate.len())
}

/// Drop sentence punctuation from the end of a URL candidate.
///
/// A closing paren is only dropped while it has no matching `(` inside the
/// URL, so `.../Rust_(programming_language)` keeps its paren.
fn trim_trailing_punctuation(candidate: &str) -> &str {
    let mut end = candidate.len();
    while let Some(c) = candidate[..end].chars().next_back() {
        let strip = match c {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => {
                let kept = &candidate[..end];
                kept.matches(')').count() > kept.matches('(').count()
            }
            _ => false,
        };
        if !strip {
            break;
        }
        end -= c.len_utf8();
    }
    &candidate[..end]
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &ParsedBody<'_>) -> Vec<SpanKind> {
        body.spans().iter().map(|s| s.kind.clone()).collect()
    }

    fn texts<'a>(body: &ParsedBody<'a>) -> Vec<&'a str> {
        body.spans().iter().map(|s| body.text(s)).collect()
    }

    #[test]
    fn test_plain_text_is_single_span() {
        let body = parse("Just words.\n\nMore words.");
        assert_eq!(kinds(&body), vec![SpanKind::Text]);
        assert_eq!(texts(&body), vec!["Just words.\n\nMore words."]);
    }

    #[test]
    fn test_empty_input_has_no_spans() {
        assert!(parse("").spans().is_empty());
    }

    #[test]
    fn test_indexed_placeholders() {
        let body = parse("Intro [IMAGE:0] middle [VIDEO:12] end");
        assert_eq!(
            kinds(&body),
            vec![
                SpanKind::Text,
                SpanKind::IndexedMedia {
                    kind: MediaKind::Image,
                    index: 0
                },
                SpanKind::Text,
                SpanKind::IndexedMedia {
                    kind: MediaKind::Video,
                    index: 12
                },
                SpanKind::Text,
            ]
        );
        assert_eq!(texts(&body)[1], "[IMAGE:0]");
        assert_eq!(texts(&body)[3], "[VIDEO:12]");
    }

    #[test]
    fn test_generic_placeholders_use_independent_cursor() {
        let body = parse("[IMAGE:4][IMAGE: first][video: second][VIDEO:0][Image: third]");
        assert_eq!(
            kinds(&body),
            vec![
                SpanKind::IndexedMedia {
                    kind: MediaKind::Image,
                    index: 4
                },
                SpanKind::GenericMedia {
                    kind: MediaKind::Image,
                    ordinal: 0
                },
                SpanKind::GenericMedia {
                    kind: MediaKind::Video,
                    ordinal: 1
                },
                SpanKind::IndexedMedia {
                    kind: MediaKind::Video,
                    index: 0
                },
                SpanKind::GenericMedia {
                    kind: MediaKind::Image,
                    ordinal: 2
                },
            ]
        );
    }

    #[test]
    fn test_generic_description() {
        let body = parse("[IMAGE:   a quiet harbour  ]");
        let span = &body.spans()[0];
        assert_eq!(body.description(span), Some("a quiet harbour"));
    }

    #[test]
    fn test_malformed_brackets_are_text() {
        for input in [
            "[IMAGE:abc]",
            "[IMAGE:]",
            "[IMAGE 1]",
            "[AUDIO:1]",
            "[IMAGE:1",
            "unterminated [ bracket",
            "[IMAGE: spans\nlines]",
            "[IMAGE: 1 ] [",
        ] {
            let body = parse(input);
            if input == "[IMAGE: 1 ] [" {
                // The generic form is valid; only the trailing bracket is text.
                assert_eq!(
                    body.spans()[0].kind,
                    SpanKind::GenericMedia {
                        kind: MediaKind::Image,
                        ordinal: 0
                    }
                );
                continue;
            }
            assert_eq!(kinds(&body), vec![SpanKind::Text], "input: {input:?}");
        }
    }

    #[test]
    fn test_index_overflow_is_text() {
        let body = parse("[IMAGE:99999999999999999999999999]");
        assert_eq!(kinds(&body), vec![SpanKind::Text]);
    }

    #[test]
    fn test_bare_url_trailing_punctuation() {
        let body = parse("See https://example.com/report.pdf. Thanks!");
        assert_eq!(
            kinds(&body),
            vec![SpanKind::Text, SpanKind::BareUrl, SpanKind::Text]
        );
        assert_eq!(texts(&body)[1], "https://example.com/report.pdf");
        assert_eq!(texts(&body)[2], ". Thanks!");
    }

    #[test]
    fn test_bare_url_case_insensitive_scheme() {
        let body = parse("HTTPS://Example.com/a.png");
        assert_eq!(kinds(&body), vec![SpanKind::BareUrl]);
    }

    #[test]
    fn test_scheme_only_is_text() {
        assert_eq!(kinds(&parse("http:// nothing")), vec![SpanKind::Text]);
        assert_eq!(kinds(&parse("https://")), vec![SpanKind::Text]);
    }

    #[test]
    fn test_url_inside_generic_placeholder_is_not_bare() {
        let body = parse("[IMAGE: from https://example.com/a.png]");
        assert_eq!(
            kinds(&body),
            vec![SpanKind::GenericMedia {
                kind: MediaKind::Image,
                ordinal: 0
            }]
        );
    }

    #[test]
    fn test_markup_short_circuit() {
        let input = "<p>Already rendered</p> [IMAGE:0] https://example.com/a.png";
        let body = parse(input);
        assert!(body.is_pass_through());
        assert_eq!(body.spans().len(), 1);
        assert_eq!(body.text(&body.spans()[0]), input);
    }

    #[test]
    fn test_looks_like_markup() {
        assert!(looks_like_markup("<p>x</p>"));
        assert!(looks_like_markup("text <br/> text"));
        assert!(looks_like_markup("</div>"));
        assert!(looks_like_markup("<img src=\"a.png\">"));
        assert!(!looks_like_markup("a < b and c > d"));
        assert!(!looks_like_markup("x<3"));
        assert!(!looks_like_markup("<b\n>"));
        assert!(!looks_like_markup("no tags here"));
    }

    #[test]
    fn test_spans_cover_input_without_gaps() {
        let input = "A [IMAGE:0] b https://x.org/v.mp4 [VIDEO: c] d \u{e9}t\u{e9}";
        let body = parse(input);
        let mut expected_start = 0;
        for span in body.spans() {
            assert_eq!(span.range.start, expected_start);
            expected_start = span.range.end;
        }
        assert_eq!(expected_start, input.len());
    }

    #[test]
    fn test_multibyte_text_before_token() {
        let body = parse("\u{4f60}\u{597d}[IMAGE:0]");
        assert_eq!(texts(&body), vec!["\u{4f60}\u{597d}", "[IMAGE:0]"]);
    }

    #[test]
    fn test_url_glued_to_word_is_text() {
        let body = parse("foohttps://x.org/a.png");
        assert_eq!(kinds(&body), vec![SpanKind::Text]);

        let body = parse("(https://x.org/a.png)");
        assert_eq!(
            kinds(&body),
            vec![SpanKind::Text, SpanKind::BareUrl, SpanKind::Text]
        );
        assert_eq!(texts(&body)[1], "https://x.org/a.png");
    }

    #[test]
    fn test_balanced_parens_stay_in_url() {
        let body = parse("See https://en.wikipedia.org/wiki/Rust_(programming_language).");
        assert_eq!(
            texts(&body)[1],
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );

        let body = parse("(see https://x.org/a_(b)))");
        assert_eq!(texts(&body)[1], "https://x.org/a_(b)");
    }

    #[test]
    fn test_overlong_url_is_text() {
        let input = format!("https://x.org/{}", "a".repeat(MAX_URL_LEN));
        assert_eq!(kinds(&parse(&input)), vec![SpanKind::Text]);
    }

    #[test]
    fn test_bracket_scan_stops_at_next_bracket() {
        let body = parse("[IMAGE: a [IMAGE:0]");
        assert_eq!(texts(&body), vec!["[IMAGE: a ", "[IMAGE:0]"]);

        let long = format!("[IMAGE: {}]", "x".repeat(MAX_PLACEHOLDER_LEN));
        assert_eq!(kinds(&parse(&long)), vec![SpanKind::Text]);
    }

    #[test]
    fn test_open_bracket_run_is_linear() {
        // An unclosed bracket run must not trigger a scan per bracket.
        let input = "[".repeat(200_000);
        let started = std::time::Instant::now();
        let body = parse(&input);
        assert_eq!(kinds(&body), vec![SpanKind::Text]);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }
}
