use anyhow::Result;

use super::schema::Database;
use super::types::{Article, ArticleDbRow, ArticleFields};

/// Maximum number of articles returned from a single listing (OOM protection)
const MAX_ARTICLES: i64 = 2000;

const ARTICLE_COLUMNS: &str =
    "id, title, excerpt, body, author, created_at, category, image_url, media_urls, read_time";

impl Database {
    // ========================================================================
    // Article Queries
    // ========================================================================

    /// All articles, newest first. Ties on `created_at` fall back to id.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let rows: Vec<ArticleDbRow> = sqlx::query_as(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(MAX_ARTICLES)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ArticleDbRow::into_article).collect())
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let row: Option<ArticleDbRow> =
            sqlx::query_as(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ArticleDbRow::into_article))
    }

    // ========================================================================
    // Article Mutations
    // ========================================================================

    /// Insert a new article stamped with the current time, returning its id
    pub async fn create_article(&self, fields: &ArticleFields) -> Result<i64> {
        let media_urls = serde_json::to_string(&fields.media_urls)?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, excerpt, body, author, created_at, category, image_url, media_urls, read_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&fields.title)
        .bind(&fields.excerpt)
        .bind(&fields.body)
        .bind(&fields.author)
        .bind(now)
        .bind(&fields.category)
        .bind(&fields.image_url)
        .bind(media_urls)
        .bind(&fields.read_time)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!(article_id = id, title = %fields.title, "Article created");
        Ok(id)
    }

    /// Overwrite every editable field. Returns false if no such article exists.
    ///
    /// There is no version check: the last write wins.
    pub async fn update_article(&self, id: i64, fields: &ArticleFields) -> Result<bool> {
        let media_urls = serde_json::to_string(&fields.media_urls)?;

        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, excerpt = ?, body = ?, author = ?, category = ?,
                image_url = ?, media_urls = ?, read_time = ?
            WHERE id = ?
        "#,
        )
        .bind(&fields.title)
        .bind(&fields.excerpt)
        .bind(&fields.body)
        .bind(&fields.author)
        .bind(&fields.category)
        .bind(&fields.image_url)
        .bind(media_urls)
        .bind(&fields.read_time)
        .bind(id)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            tracing::info!(article_id = id, "Article updated");
        }
        Ok(updated)
    }

    /// Returns false if no such article exists
    pub async fn delete_article(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(article_id = id, "Article deleted");
        }
        Ok(deleted)
    }
}
