use crate::storage::Article;
use crate::util::{escape_html, format_publication_date};

/// Render the full article view: header, optional primary image, and body.
///
/// `body_html` is the assembled body (see [`super::render_body`]); it is
/// inserted as-is. Every other field is escaped.
pub fn render_article_page(article: &Article, body_html: &str) -> String {
    let mut out = String::with_capacity(body_html.len() + 1024);

    out.push_str("<article class=\"article\">\n<header class=\"article-header\">\n");
    out.push_str(&format!(
        "<span class=\"article-category\">{}</span>",
        escape_html(&article.category)
    ));
    if !article.read_time.trim().is_empty() {
        out.push_str(&format!(
            " <span class=\"article-read-time\">{}</span>",
            escape_html(&article.read_time)
        ));
    }
    out.push('\n');
    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&article.title)));
    out.push_str(&format!(
        "<p class=\"article-byline\"><span class=\"article-author\">{}</span> <time datetime=\"{}\">{}</time></p>\n",
        escape_html(&article.author),
        article.created_at,
        format_publication_date(article.created_at),
    ));
    if !article.excerpt.trim().is_empty() {
        out.push_str(&format!(
            "<p class=\"article-excerpt\">{}</p>\n",
            escape_html(&article.excerpt)
        ));
    }
    out.push_str("</header>\n");

    if let Some(image) = article.image_url.as_deref().filter(|u| !u.is_empty()) {
        out.push_str(&format!(
            "<figure class=\"article-cover\"><img src=\"{}\" alt=\"{}\" /></figure>\n",
            escape_html(image),
            escape_html(&article.title)
        ));
    }

    out.push_str("<div class=\"article-body\">\n");
    out.push_str(body_html);
    if !body_html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</div>\n");
    out.push_str(&format!(
        "<footer class=\"article-footer\">Written by {}</footer>\n</article>\n",
        escape_html(&article.author)
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Article {
        Article {
            id: 7,
            title: "Supply <Chains>".to_string(),
            excerpt: "Lessons from SMEs".to_string(),
            body: String::new(),
            author: "Samuel Mensah".to_string(),
            created_at: 1_710_072_000,
            category: "Business".to_string(),
            image_url: Some("https://cdn.example.com/cover.jpg".to_string()),
            media_urls: Vec::new(),
            read_time: "6 min read".to_string(),
        }
    }

    #[test]
    fn test_page_contains_header_fields() {
        let html = render_article_page(&sample(), "<p>Body</p>\n");
        assert!(html.contains("<h1>Supply &lt;Chains&gt;</h1>"));
        assert!(html.contains("March 10, 2024"));
        assert!(html.contains("6 min read"));
        assert!(html.contains("class=\"article-excerpt\">Lessons from SMEs<"));
        assert!(html.contains("src=\"https://cdn.example.com/cover.jpg\""));
        assert!(html.contains("<div class=\"article-body\">\n<p>Body</p>\n</div>"));
    }

    #[test]
    fn test_page_omits_empty_optionals() {
        let mut article = sample();
        article.image_url = None;
        article.excerpt = "  ".to_string();
        article.read_time = String::new();

        let html = render_article_page(&article, "");
        assert!(!html.contains("article-cover"));
        assert!(!html.contains("article-excerpt"));
        assert!(!html.contains("article-read-time"));
    }
}
