use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The database is locked by another process. Please close it and try again.")]
    Locked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping SQLite lock conditions to [`DatabaseError::Locked`]
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::Locked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) messages
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Articles
// ============================================================================

/// A published magazine article.
///
/// `media_urls` is positionally stable: `[IMAGE:i]` in `body` always refers
/// to `media_urls[i]` for a given snapshot of the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    /// Raw body: placeholder tokens, bare URLs, or pre-rendered markup
    pub body: String,
    pub author: String,
    /// Unix seconds
    pub created_at: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub media_urls: Vec<String>,
    /// Free text, e.g. "6 min read"
    pub read_time: String,
}

/// The editable subset of an [`Article`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFields {
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author: String,
    pub category: String,
    pub image_url: Option<String>,
    pub media_urls: Vec<String>,
    pub read_time: String,
}

impl From<Article> for ArticleFields {
    fn from(article: Article) -> Self {
        Self {
            title: article.title,
            excerpt: article.excerpt,
            body: article.body,
            author: article.author,
            category: article.category,
            image_url: article.image_url,
            media_urls: article.media_urls,
            read_time: article.read_time,
        }
    }
}

/// Internal row type for article queries (used by sqlx FromRow).
/// `media_urls` is stored as a JSON array and decoded by `into_article()`.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleDbRow {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub author: String,
    pub created_at: i64,
    pub category: String,
    pub image_url: Option<String>,
    pub media_urls: String,
    pub read_time: String,
}

impl ArticleDbRow {
    pub(crate) fn into_article(self) -> Article {
        let media_urls = serde_json::from_str(&self.media_urls).unwrap_or_else(|e| {
            tracing::warn!(article_id = self.id, error = %e, "Corrupt media_urls column, treating as empty");
            Vec::new()
        });
        Article {
            id: self.id,
            title: self.title,
            excerpt: self.excerpt,
            body: self.body,
            author: self.author,
            created_at: self.created_at,
            category: self.category,
            image_url: self.image_url,
            media_urls,
            read_time: self.read_time,
        }
    }
}

// ============================================================================
// Subscribers
// ============================================================================

/// A newsletter subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    /// Unix seconds
    pub subscribed_at: i64,
    pub is_active: bool,
}

/// Result of a public subscribe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed(i64),
    AlreadySubscribed,
}

// ============================================================================
// Accounts
// ============================================================================

/// Role classification attached to an account's profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parse a stored role. Anything that is not exactly `admin` is an ordinary user.
    pub fn from_db(value: &str) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// Credential row for an account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRecord {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}
