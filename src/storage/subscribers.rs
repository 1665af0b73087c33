use anyhow::Result;

use super::schema::Database;
use super::types::{SubscribeOutcome, Subscriber};
use crate::contact::SubscriberEmail;

impl Database {
    // ========================================================================
    // Subscriber Operations
    // ========================================================================

    /// Add an address to the newsletter list.
    ///
    /// An address already on the list (compared case-insensitively) is reported
    /// as [`SubscribeOutcome::AlreadySubscribed`] rather than an error.
    pub async fn subscribe(&self, email: &SubscriberEmail) -> Result<SubscribeOutcome> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO subscribers (email, subscribed_at, is_active)
            VALUES (?, ?, 1)
            ON CONFLICT(email) DO NOTHING
        "#,
        )
        .bind(email.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(email = %email, "Address already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        let id = result.last_insert_rowid();
        tracing::info!(subscriber_id = id, "Subscriber added");
        Ok(SubscribeOutcome::Subscribed(id))
    }

    /// Active subscribers, newest first
    pub async fn list_active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let rows: Vec<Subscriber> = sqlx::query_as(
            r#"
            SELECT id, email, subscribed_at, is_active
            FROM subscribers
            WHERE is_active = 1
            ORDER BY subscribed_at DESC, id DESC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Remove a subscriber. Returns false if the id was unknown.
    pub async fn delete_subscriber(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM subscribers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(subscriber_id = id, "Subscriber deleted");
        }
        Ok(deleted)
    }
}
