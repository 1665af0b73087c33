//! Media resolution: turns parsed spans into concrete media references.

use std::borrow::Cow;

use url::Url;

use super::tokens::{MediaKind, ParsedBody, Span, SpanKind};

/// File extensions rendered as `<img>`.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif"];

/// File extensions rendered as `<video>`.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "ogg", "mov", "m4v"];

/// A span after media lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Plain text to paragraph-wrap.
    Text(&'a str),
    /// Embedded media element.
    Media {
        kind: MediaKind,
        url: &'a str,
        alt: Cow<'a, str>,
    },
    /// A bare URL that is not media: rendered as a hyperlink.
    Link(&'a str),
    /// Out-of-range placeholder: renders nothing.
    Nothing,
    /// Pre-rendered markup, emitted untouched.
    PassThrough(&'a str),
}

/// Infer a media kind from the extension of a URL's last path segment.
///
/// Query strings and fragments are ignored. Returns `None` for URLs that do
/// not parse or whose extension is not a known image/video type.
///
/// # Examples
///
/// ```
/// use gazette::content::{infer_media_kind, MediaKind};
///
/// assert_eq!(infer_media_kind("https://x.org/a.PNG?w=300"), Some(MediaKind::Image));
/// assert_eq!(infer_media_kind("https://x.org/clip.webm"), Some(MediaKind::Video));
/// assert_eq!(infer_media_kind("https://x.org/report.pdf"), None);
/// ```
pub fn infer_media_kind(url: &str) -> Option<MediaKind> {
    media_kind_for_extension(&url_extension(url)?)
}

/// Classify a file extension (without the dot), ignoring ASCII case.
pub fn media_kind_for_extension(ext: &str) -> Option<MediaKind> {
    let ext = ext.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Lowercased extension of the last path segment, if any.
pub(crate) fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolves spans of one parsed body against its media-reference list.
///
/// Resolution is positional: index `i` in `media` is always the same item for
/// a given snapshot. Lookups that fall outside the list produce
/// [`Resolved::Nothing`], never an error.
pub struct MediaResolver<'m> {
    media: &'m [String],
}

impl<'m> MediaResolver<'m> {
    pub fn new(media: &'m [String]) -> Self {
        Self { media }
    }

    fn lookup(&self, index: usize) -> Option<&'m str> {
        self.media.get(index).map(String::as_str)
    }

    /// Resolve a single span.
    pub fn resolve<'a>(&self, body: &ParsedBody<'a>, span: &Span) -> Resolved<'a>
    where
        'm: 'a,
    {
        match span.kind {
            SpanKind::Text => Resolved::Text(body.text(span)),
            SpanKind::PassThrough => Resolved::PassThrough(body.text(span)),
            SpanKind::IndexedMedia { kind, index } => match self.lookup(index) {
                Some(url) => Resolved::Media {
                    kind,
                    url,
                    alt: default_alt(index),
                },
                None => {
                    tracing::debug!(index, available = self.media.len(), "Indexed placeholder out of range");
                    Resolved::Nothing
                }
            },
            // The declared label wins over whatever the URL extension says.
            SpanKind::GenericMedia { kind, ordinal } => match self.lookup(ordinal) {
                Some(url) => {
                    let alt = match body.description(span) {
                        Some(desc) if !desc.is_empty() => Cow::Borrowed(desc),
                        _ => default_alt(ordinal),
                    };
                    Resolved::Media { kind, url, alt }
                }
                None => {
                    tracing::debug!(ordinal, available = self.media.len(), "Generic placeholder out of range");
                    Resolved::Nothing
                }
            },
            SpanKind::BareUrl => {
                let url = body.text(span);
                match infer_media_kind(url) {
                    Some(MediaKind::Image) => Resolved::Media {
                        kind: MediaKind::Image,
                        url,
                        alt: Cow::Borrowed("Embedded image"),
                    },
                    Some(MediaKind::Video) => Resolved::Media {
                        kind: MediaKind::Video,
                        url,
                        alt: Cow::Borrowed("Embedded video"),
                    },
                    None => Resolved::Link(url),
                }
            }
        }
    }

    /// Resolve every span of `body` in document order.
    pub fn resolve_all<'a>(&self, body: &ParsedBody<'a>) -> Vec<Resolved<'a>>
    where
        'm: 'a,
    {
        body.spans()
            .iter()
            .map(|span| self.resolve(body, span))
            .collect()
    }
}

fn default_alt(index: usize) -> Cow<'static, str> {
    Cow::Owned(format!("Article media {}", index + 1))
}
