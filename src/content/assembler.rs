//! HTML assembly for resolved article spans.
//!
//! Text and hyperlinks are inline and accumulate into the current paragraph.
//! Media elements are blocks: they close the open paragraph and are written
//! at their original position. Output is deterministic for a given input.

use std::mem;

use super::resolver::{url_extension, Resolved};
use super::tokens::MediaKind;
use crate::util::escape_html;

#[derive(Debug, Clone, Copy)]
enum Inline<'a> {
    Text(&'a str),
    Link(&'a str),
}

/// Accumulates markup for one article body.
#[derive(Default)]
pub struct HtmlAssembler<'a> {
    out: String,
    paragraph: Vec<Inline<'a>>,
}

impl<'a> HtmlAssembler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble resolved spans into markup, preserving their order.
    pub fn assemble(mut self, resolved: &[Resolved<'a>]) -> String {
        for item in resolved {
            match item {
                Resolved::Text(text) => self.push_text(*text),
                Resolved::Link(url) => self.paragraph.push(Inline::Link(*url)),
                Resolved::Media { kind, url, alt } => {
                    self.flush_paragraph();
                    self.write_media(*kind, url, alt);
                }
                // An unresolved placeholder still occupies a block slot.
                Resolved::Nothing => self.flush_paragraph(),
                Resolved::PassThrough(raw) => {
                    self.flush_paragraph();
                    self.out.push_str(raw);
                }
            }
        }
        self.flush_paragraph();
        self.out
    }

    fn push_text(&mut self, text: &'a str) {
        for (idx, piece) in paragraph_pieces(text).into_iter().enumerate() {
            if idx > 0 {
                self.flush_paragraph();
            }
            self.paragraph.push(Inline::Text(piece));
        }
    }

    fn flush_paragraph(&mut self) {
        let mut items = mem::take(&mut self.paragraph);

        // Trim the paragraph edges, dropping text that is only whitespace.
        loop {
            match items.first().copied() {
                Some(Inline::Text(t)) if t.trim_start().is_empty() => {
                    items.remove(0);
                }
                Some(Inline::Text(t)) => {
                    items[0] = Inline::Text(t.trim_start());
                    break;
                }
                _ => break,
            }
        }
        loop {
            match items.last().copied() {
                Some(Inline::Text(t)) if t.trim_end().is_empty() => {
                    items.pop();
                }
                Some(Inline::Text(t)) => {
                    let last = items.len() - 1;
                    items[last] = Inline::Text(t.trim_end());
                    break;
                }
                _ => break,
            }
        }

        if items.is_empty() {
            return;
        }

        self.out.push_str("<p>");
        for item in items {
            match item {
                Inline::Text(text) => self.write_text(text),
                Inline::Link(url) => self.write_link(url),
            }
        }
        self.out.push_str("</p>\n");
    }

    /// Escaped text with single newlines turned into line breaks.
    fn write_text(&mut self, text: &str) {
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                self.out.push_str("<br />");
            }
            self.out.push_str(&escape_html(line.trim_end_matches('\r')));
        }
    }

    fn write_link(&mut self, url: &str) {
        let url = escape_html(url);
        self.out.push_str("<a href=\"");
        self.out.push_str(&url);
        self.out
            .push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
        self.out.push_str(&url);
        self.out.push_str("</a>");
    }

    fn write_media(&mut self, kind: MediaKind, url: &str, alt: &str) {
        self.out.push_str("<figure class=\"article-media\">");
        match kind {
            MediaKind::Image => {
                self.out.push_str("<img src=\"");
                self.out.push_str(&escape_html(url));
                self.out.push_str("\" alt=\"");
                self.out.push_str(&escape_html(alt));
                self.out
                    .push_str("\" loading=\"lazy\" class=\"article-image\" />");
            }
            MediaKind::Video => {
                self.out.push_str(
                    "<video controls preload=\"metadata\" class=\"article-video\"><source src=\"",
                );
                self.out.push_str(&escape_html(url));
                self.out.push('"');
                if let Some(mime) = video_mime_type(url) {
                    self.out.push_str(" type=\"");
                    self.out.push_str(mime);
                    self.out.push('"');
                }
                self.out.push_str(" /></video>");
            }
        }
        self.out.push_str("</figure>\n");
    }
}

/// MIME type for a `<source>` element, when the extension is a known video type.
fn video_mime_type(url: &str) -> Option<&'static str> {
    match url_extension(url)?.as_str() {
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogg" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        "m4v" => Some("video/x-m4v"),
        _ => None,
    }
}

/// Split text at blank-line boundaries: runs of two or more newlines.
///
/// Carriage returns inside a run are ignored, so `\r\n\r\n` is a boundary.
/// Always returns at least one piece.
fn paragraph_pieces(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\n' && bytes[i] != b'\r' {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut newlines = 0;
        while i < bytes.len() && (bytes[i] == b'\n' || bytes[i] == b'\r') {
            if bytes[i] == b'\n' {
                newlines += 1;
            }
            i += 1;
        }
        if newlines >= 2 {
            pieces.push(&text[start..run_start]);
            start = i;
        }
    }

    pieces.push(&text[start..]);
    pieces
}
