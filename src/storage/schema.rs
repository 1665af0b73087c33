use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_message, DatabaseError};

/// Default subject line seeded into the newsletter template row
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "New Article: {{title}}";

/// Default body seeded into the newsletter template row
pub const DEFAULT_BODY_TEMPLATE: &str =
    "A new article has been published.\n\n{{title}}\n\n{{excerpt}}\n\nRead it here: {{url}}";

// ============================================================================
// Database
// ============================================================================

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations
    ///
    /// Pass `":memory:"` for an isolated in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the database
    /// lock (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns `DatabaseError::Migration` if the schema could not be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode=rwc", path);

        // Accounts hold password hashes. Restrict the file before the pool
        // opens it so it never exists with umask permissions.
        #[cfg(unix)]
        if path != ":memory:" {
            restrict_permissions(std::path::Path::new(path));
        }

        // busy_timeout=5000: wait up to 5 seconds for locks before SQLITE_BUSY.
        // Set via pragma() so every pooled connection inherits it.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);
        // SQLite is single-writer; a handful of connections covers concurrent readers.
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        let db = Self { pool };
        db.migrate().await.map_err(|e| {
            if is_lock_message(&e.to_string()) {
                DatabaseError::Locked
            } else {
                DatabaseError::Migration(e.to_string())
            }
        })?;
        tracing::debug!(path = %path, "Database opened");
        Ok(db)
    }

    /// Run database migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS` / `INSERT OR IGNORE`, so re-running
    /// on an existing database is a no-op.
    async fn migrate(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Articles. media_urls holds a JSON array of strings.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                excerpt TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL,
                author TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                category TEXT NOT NULL,
                image_url TEXT,
                media_urls TEXT NOT NULL DEFAULT '[]',
                read_time TEXT NOT NULL DEFAULT ''
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_articles_created ON articles(created_at DESC, id DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // Newsletter subscribers. Email uniqueness is case-insensitive.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                subscribed_at INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscribers_active ON subscribers(is_active, subscribed_at DESC)",
        )
        .execute(&mut *tx)
        .await?;

        // Singleton newsletter template row (id is pinned to 1)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS newsletter_settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                subject_template TEXT NOT NULL,
                email_template TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO newsletter_settings (id, subject_template, email_template, updated_at)
            VALUES (1, ?, ?, ?)
        "#,
        )
        .bind(DEFAULT_SUBJECT_TEMPLATE)
        .bind(DEFAULT_BODY_TEMPLATE)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        // Accounts and their role profiles
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id INTEGER PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
                role TEXT NOT NULL DEFAULT 'user'
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Commit all migrations atomically
        tx.commit().await?;

        Ok(())
    }
}

/// Make the database file owner-only, creating it with mode 0600 if absent.
#[cfg(unix)]
fn restrict_permissions(db_path: &std::path::Path) {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if db_path.exists() {
        let perms = std::fs::Permissions::from_mode(0o600);
        if let Err(e) = std::fs::set_permissions(db_path, perms) {
            tracing::warn!(path = %db_path.display(), error = %e, "Failed to restrict database permissions");
        }
    } else if db_path
        .parent()
        .map_or(true, |p| p.as_os_str().is_empty() || p.exists())
    {
        // If this fails SQLite reports the real error at connect time.
        let _ = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(db_path);
    }
}
