use anyhow::Result;

use super::schema::Database;
use crate::newsletter::NewsletterTemplate;

impl Database {
    // ========================================================================
    // Newsletter Template
    // ========================================================================

    /// The singleton template row, seeded with defaults at migration time
    pub async fn get_template(&self) -> Result<NewsletterTemplate> {
        let (subject, body): (String, String) = sqlx::query_as(
            "SELECT subject_template, email_template FROM newsletter_settings WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(NewsletterTemplate { subject, body })
    }

    pub async fn save_template(&self, template: &NewsletterTemplate) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO newsletter_settings (id, subject_template, email_template, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                subject_template = excluded.subject_template,
                email_template = excluded.email_template,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(&template.subject)
        .bind(&template.body)
        .bind(now)
        .execute(&self.pool)
        .await?;

        tracing::info!("Newsletter template saved");
        Ok(())
    }
}
