//! Privileged content management.
//!
//! [`AdminConsole`] is the only way to mutate articles, subscribers or the
//! newsletter template. Every operation calls [`AdminGate::authorize`] first,
//! so a session whose admin role was revoked is ended before anything is
//! written.

use thiserror::Error;

use crate::auth::{AdminGate, AuthError, IdentityProvider};
use crate::contact::ValidationError;
use crate::newsletter::{dispatch, DispatchReport, MailError, Mailer, NewsletterTemplate, TemplateContext};
use crate::storage::{ArticleFields, Database, Subscriber};
use crate::uploads::{upload_batch, upload_image, BlobStore, UploadError, UploadFile};
use crate::util::{to_single_line, validate_media_url};

/// Categories an article may be filed under
pub const CATEGORIES: &[&str] = &[
    "Entrepreneurship",
    "Technology",
    "Business",
    "Innovation",
    "Startups",
    "Investment",
    "Leadership",
];

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("Mail failed: {0}")]
    Mail(#[from] MailError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Article fields plus files to upload before the write
#[derive(Debug, Clone, Default)]
pub struct ArticleDraft {
    pub fields: ArticleFields,
    /// Replaces `fields.image_url` once uploaded
    pub cover_image: Option<UploadFile>,
    /// Appended to `fields.media_urls` in order
    pub media_files: Vec<UploadFile>,
}

impl From<ArticleFields> for ArticleDraft {
    fn from(fields: ArticleFields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }
}

pub struct AdminConsole<P, B, M> {
    gate: AdminGate<P>,
    db: Database,
    store: B,
    mailer: M,
    site_url: String,
}

impl<P, B, M> AdminConsole<P, B, M>
where
    P: IdentityProvider,
    B: BlobStore,
    M: Mailer,
{
    pub fn new(gate: AdminGate<P>, db: Database, store: B, mailer: M, site_url: &str) -> Self {
        Self {
            gate,
            db,
            store,
            mailer,
            site_url: site_url.to_string(),
        }
    }

    pub fn gate(&self) -> &AdminGate<P> {
        &self.gate
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AdminError> {
        self.gate.sign_in(email, password).await?;
        Ok(())
    }

    pub async fn sign_out(&mut self) {
        self.gate.sign_out().await;
    }

    // ========================================================================
    // Articles
    // ========================================================================

    /// Validate, upload attached files, then insert. Returns the new id.
    pub async fn create_article(&mut self, draft: ArticleDraft) -> Result<i64, AdminError> {
        self.gate.authorize().await?;

        let fields = self.prepare(draft).await?;
        let id = self.db.create_article(&fields).await?;
        Ok(id)
    }

    /// Overwrite an article. Concurrent edits are not reconciled; the last
    /// write wins.
    pub async fn update_article(&mut self, id: i64, draft: ArticleDraft) -> Result<(), AdminError> {
        self.gate.authorize().await?;

        // Check before uploading so a bad id does not store orphan files
        if self.db.get_article(id).await?.is_none() {
            return Err(AdminError::NotFound { kind: "Article", id });
        }

        let fields = self.prepare(draft).await?;
        if !self.db.update_article(id, &fields).await? {
            return Err(AdminError::NotFound { kind: "Article", id });
        }
        Ok(())
    }

    pub async fn delete_article(&mut self, id: i64) -> Result<(), AdminError> {
        self.gate.authorize().await?;

        if !self.db.delete_article(id).await? {
            return Err(AdminError::NotFound { kind: "Article", id });
        }
        Ok(())
    }

    /// Validate the fields, then run uploads. Any failure aborts before the
    /// article is touched.
    async fn prepare(&self, draft: ArticleDraft) -> Result<ArticleFields, AdminError> {
        let mut fields = validate_article(draft.fields)?;

        if let Some(cover) = &draft.cover_image {
            fields.image_url = Some(upload_image(&self.store, cover).await?);
        }
        if !draft.media_files.is_empty() {
            let urls = upload_batch(&self.store, &draft.media_files).await?;
            fields.media_urls.extend(urls);
        }

        Ok(fields)
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    pub async fn list_subscribers(&mut self) -> Result<Vec<Subscriber>, AdminError> {
        self.gate.authorize().await?;
        Ok(self.db.list_active_subscribers().await?)
    }

    pub async fn delete_subscriber(&mut self, id: i64) -> Result<(), AdminError> {
        self.gate.authorize().await?;

        if !self.db.delete_subscriber(id).await? {
            return Err(AdminError::NotFound {
                kind: "Subscriber",
                id,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Newsletter
    // ========================================================================

    pub async fn template(&mut self) -> Result<NewsletterTemplate, AdminError> {
        self.gate.authorize().await?;
        Ok(self.db.get_template().await?)
    }

    pub async fn save_template(&mut self, template: &NewsletterTemplate) -> Result<(), AdminError> {
        self.gate.authorize().await?;

        if template.subject.trim().is_empty() {
            return Err(ValidationError::new("subject", "Subject is required").into());
        }
        if template.body.trim().is_empty() {
            return Err(ValidationError::new("body", "Email body is required").into());
        }

        self.db.save_template(template).await?;
        Ok(())
    }

    /// Announce an article to every active subscriber
    pub async fn publish_newsletter(&mut self, article_id: i64) -> Result<DispatchReport, AdminError> {
        self.gate.authorize().await?;
        if !self.mailer.is_configured() {
            return Err(MailError::NotConfigured.into());
        }

        let article = self
            .db
            .get_article(article_id)
            .await?
            .ok_or(AdminError::NotFound {
                kind: "Article",
                id: article_id,
            })?;
        let template = self.db.get_template().await?;
        let message = template.render(&TemplateContext::for_article(&article, &self.site_url));
        let subscribers = self.db.list_active_subscribers().await?;

        tracing::info!(
            article_id,
            recipients = subscribers.len(),
            "Publishing newsletter"
        );
        Ok(dispatch(&self.mailer, &message, &subscribers).await)
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Normalize and check article fields.
///
/// Single-line fields are flattened to one line without control characters. The
/// category is matched case-insensitively and stored in its canonical form.
pub fn validate_article(fields: ArticleFields) -> Result<ArticleFields, ValidationError> {
    let title = to_single_line(&fields.title);
    if title.is_empty() {
        return Err(ValidationError::new("title", "Title is required"));
    }
    if fields.body.trim().is_empty() {
        return Err(ValidationError::new("body", "Content is required"));
    }
    let author = to_single_line(&fields.author);
    if author.is_empty() {
        return Err(ValidationError::new("author", "Author is required"));
    }

    let category = to_single_line(&fields.category);
    let category = CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(&category))
        .ok_or_else(|| {
            ValidationError::new("category", format!("Unknown category: {}", category))
        })?;

    let image_url = match fields.image_url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(url) => Some(
            validate_media_url(url)
                .map_err(|e| ValidationError::new("image_url", e.to_string()))?
                .to_string(),
        ),
    };

    let media_urls = fields
        .media_urls
        .iter()
        .map(|url| {
            validate_media_url(url)
                .map(|u| u.to_string())
                .map_err(|e| ValidationError::new("media_urls", format!("{}: {}", url.trim(), e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArticleFields {
        title,
        excerpt: fields.excerpt.trim().to_string(),
        body: fields.body,
        author,
        category: (*category).to_string(),
        image_url,
        media_urls,
        read_time: to_single_line(&fields.read_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ArticleFields {
        ArticleFields {
            title: "  Scaling\u{7} Up ".to_string(),
            excerpt: " Notes ".to_string(),
            body: "Body text".to_string(),
            author: "Yaw".to_string(),
            category: "startups".to_string(),
            image_url: Some(" ".to_string()),
            media_urls: vec!["https://cdn.example.com/a.png".to_string()],
            read_time: "3 min read".to_string(),
        }
    }

    #[test]
    fn test_validate_normalizes_fields() {
        let valid = validate_article(fields()).unwrap();
        assert_eq!(valid.title, "Scaling Up");
        assert_eq!(valid.excerpt, "Notes");
        assert_eq!(valid.category, "Startups");
        assert_eq!(valid.image_url, None);
    }

    #[test]
    fn test_validate_flattens_single_line_fields() {
        let mut f = fields();
        f.title = "Scaling\nUp\r\n".to_string();
        f.author = "Yaw\tMensah".to_string();
        let valid = validate_article(f).unwrap();
        assert_eq!(valid.title, "Scaling Up");
        assert_eq!(valid.author, "Yaw Mensah");
    }

    #[test]
    fn test_validate_required_fields() {
        let mut f = fields();
        f.title = " \t".to_string();
        assert_eq!(validate_article(f).unwrap_err().field, "title");

        let mut f = fields();
        f.body = "\n\n".to_string();
        assert_eq!(validate_article(f).unwrap_err().field, "body");

        let mut f = fields();
        f.author = String::new();
        assert_eq!(validate_article(f).unwrap_err().field, "author");
    }

    #[test]
    fn test_validate_rejects_unknown_category() {
        let mut f = fields();
        f.category = "Gossip".to_string();
        assert_eq!(validate_article(f).unwrap_err().field, "category");
    }

    #[test]
    fn test_validate_rejects_bad_media_urls() {
        let mut f = fields();
        f.media_urls.push("javascript:alert(1)".to_string());
        assert_eq!(validate_article(f).unwrap_err().field, "media_urls");

        let mut f = fields();
        f.image_url = Some("ftp://example.com/a.png".to_string());
        assert_eq!(validate_article(f).unwrap_err().field, "image_url");
    }
}
