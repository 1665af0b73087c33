use anyhow::Result;

use super::schema::Database;
use super::types::{AccountRecord, Role};

impl Database {
    // ========================================================================
    // Accounts & Profiles
    // ========================================================================

    /// Insert an account and its profile row in one transaction.
    ///
    /// Callers hash the password; this layer only stores the PHC string.
    pub async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO accounts (email, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO profiles (user_id, role) VALUES (?, ?)")
            .bind(id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(account_id = id, role = role.as_str(), "Account created");
        Ok(id)
    }

    /// Look up credentials by email (case-insensitive)
    pub async fn find_account(&self, email: &str) -> Result<Option<AccountRecord>> {
        let row: Option<AccountRecord> = sqlx::query_as(
            "SELECT id, email, password_hash FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Role recorded in the account's profile, or `None` if no profile exists
    pub async fn get_role(&self, user_id: i64) -> Result<Option<Role>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT role FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(role,)| Role::from_db(&role)))
    }

    /// Change a profile's role. Returns false if the profile does not exist.
    pub async fn set_role(&self, user_id: i64, role: Role) -> Result<bool> {
        let result = sqlx::query("UPDATE profiles SET role = ? WHERE user_id = ?")
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            tracing::info!(account_id = user_id, role = role.as_str(), "Role changed");
        }
        Ok(updated)
    }
}
