//! Newsletter templates and outbound mail.

use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::storage::{Article, Subscriber, DEFAULT_BODY_TEMPLATE, DEFAULT_SUBJECT_TEMPLATE};
use crate::util::{validate_endpoint, UrlValidationError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// Templates
// ============================================================================

/// Subject and body with `{{title}}`, `{{excerpt}}` and `{{url}}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterTemplate {
    pub subject: String,
    pub body: String,
}

impl Default for NewsletterTemplate {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT_TEMPLATE.to_string(),
            body: DEFAULT_BODY_TEMPLATE.to_string(),
        }
    }
}

/// Values substituted into a [`NewsletterTemplate`]
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub title: &'a str,
    pub excerpt: &'a str,
    pub url: String,
}

impl<'a> TemplateContext<'a> {
    pub fn for_article(article: &'a Article, site_url: &str) -> Self {
        Self {
            title: &article.title,
            excerpt: &article.excerpt,
            url: article_url(site_url, article.id),
        }
    }
}

/// A template with its placeholders filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

impl NewsletterTemplate {
    /// Substitute placeholders literally. Unrecognised `{{...}}` text is kept.
    pub fn render(&self, ctx: &TemplateContext<'_>) -> RenderedMessage {
        RenderedMessage {
            subject: fill(&self.subject, ctx),
            body: fill(&self.body, ctx),
        }
    }
}

/// Single left-to-right pass; substituted values are never rescanned.
fn fill(template: &str, ctx: &TemplateContext<'_>) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = [
            ("{{title}}", ctx.title),
            ("{{excerpt}}", ctx.excerpt),
            ("{{url}}", ctx.url.as_str()),
        ]
        .into_iter()
        .find(|(placeholder, _)| tail.starts_with(*placeholder));

        match value {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Public URL of an article page
pub fn article_url(site_url: &str, id: i64) -> String {
    format!("{}/article/{}", site_url.trim_end_matches('/'), id)
}

// ============================================================================
// Mail transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail request timed out after {}s", REQUEST_TIMEOUT.as_secs())]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Mail service returned status {0}")]
    HttpStatus(u16),
    #[error("Invalid mail endpoint: {0}")]
    Endpoint(#[from] UrlValidationError),
    #[error("No mail endpoint is configured")]
    NotConfigured,
}

impl MailError {
    /// Returns true if this error is transient and the request should be retried.
    fn is_retryable(&self) -> bool {
        match self {
            MailError::Timeout | MailError::Network(_) => true,
            MailError::HttpStatus(status) => *status >= 500,
            MailError::Endpoint(_) | MailError::NotConfigured => false,
        }
    }
}

/// Outbound mail service
pub trait Mailer {
    fn send(&self, email: &OutgoingEmail) -> impl Future<Output = Result<(), MailError>> + Send;

    /// False when every send would fail with [`MailError::NotConfigured`]
    fn is_configured(&self) -> bool {
        true
    }
}

/// `None` stands for a deployment without outbound mail; every send fails.
impl<M: Mailer + Sync> Mailer for Option<M> {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        match self {
            Some(mailer) => mailer.send(email).await,
            None => Err(MailError::NotConfigured),
        }
    }

    fn is_configured(&self) -> bool {
        self.as_ref().is_some_and(|mailer| mailer.is_configured())
    }
}

/// Posts each message as JSON `{to, subject, body}` to a mail API endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<SecretString>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpMailer {
    /// # Errors
    ///
    /// Rejects endpoints that are not HTTPS, except on localhost.
    pub fn new(endpoint: &str, api_key: Option<SecretString>) -> Result<Self, MailError> {
        let endpoint = validate_endpoint(endpoint)?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Override retry behaviour. Delays double after each attempt.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    async fn post_once(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut request = self.client.post(self.endpoint.clone()).json(email);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = tokio::time::timeout(REQUEST_TIMEOUT, request.send())
            .await
            .map_err(|_| MailError::Timeout)?
            .map_err(MailError::Network)?;

        if !response.status().is_success() {
            return Err(MailError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let mut attempt = 0;
        loop {
            match self.post_once(email).await {
                Ok(()) => {
                    tracing::debug!(to = %email.to, "Mail accepted");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_delay * (1u32 << attempt);
                    tracing::debug!(
                        error = %e,
                        retry = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying mail after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Outcome of sending one message to many subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    /// Addresses whose delivery failed
    pub failed: Vec<String>,
}

/// Send `message` to every subscriber, continuing past individual failures.
pub async fn dispatch<M: Mailer>(
    mailer: &M,
    message: &RenderedMessage,
    recipients: &[Subscriber],
) -> DispatchReport {
    let mut report = DispatchReport::default();

    for subscriber in recipients {
        let email = OutgoingEmail {
            to: subscriber.email.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
        };
        match mailer.send(&email).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(subscriber_id = subscriber.id, error = %e, "Newsletter delivery failed");
                report.failed.push(subscriber.email.clone());
            }
        }
    }

    tracing::info!(
        sent = report.sent,
        failed = report.failed.len(),
        "Newsletter dispatch finished"
    );
    report
}
