//! Article body rendering.
//!
//! Raw article text goes through three stages:
//!
//! 1. [`tokens::parse`] splits it into plain text, media placeholders and bare URLs
//! 2. [`MediaResolver`] binds placeholders to the article's media-reference list
//! 3. [`HtmlAssembler`] writes paragraphs, media elements and links in order
//!
//! [`render_body`] runs all three. It is a pure function of its inputs and
//! never fails: malformed tokens stay text and out-of-range references render
//! nothing.
//!
//! # Examples
//!
//! ```
//! use gazette::content::render_body;
//!
//! let media = vec!["https://cdn.example.com/harbour.jpg".to_string()];
//! let html = render_body("At dawn:\n\n[IMAGE:0]", &media);
//! assert!(html.starts_with("<p>At dawn:</p>"));
//! assert!(html.contains("src=\"https://cdn.example.com/harbour.jpg\""));
//! ```

mod assembler;
mod cache;
mod page;
mod resolver;
pub mod tokens;

pub use assembler::HtmlAssembler;
pub use cache::RenderCache;
pub use page::render_article_page;
pub use resolver::{
    infer_media_kind, media_kind_for_extension, MediaResolver, Resolved, IMAGE_EXTENSIONS,
    VIDEO_EXTENSIONS,
};
pub use tokens::{MediaKind, ParsedBody, Span, SpanKind};

/// Render a raw article body to HTML.
///
/// Input that already contains markup is returned unchanged, even if it also
/// contains placeholder tokens.
pub fn render_body(text: &str, media: &[String]) -> String {
    let body = tokens::parse(text);
    if body.is_pass_through() {
        return text.to_owned();
    }

    let resolved = MediaResolver::new(media).resolve_all(&body);
    HtmlAssembler::new().assemble(&resolved)
}
