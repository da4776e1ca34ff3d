use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, AccountLookup, AccountStore, NewAccount};
use crate::error::StoreError;

const ACCOUNT_COLUMNS: &str = "id, user_name, email, full_name, avatar, cover_image, \
     password_hash, refresh_token, created_at, updated_at";

/// Postgres-backed account store (`users` table, see `migrations/`)
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a single-column `UPDATE ... RETURNING` for one account
    async fn update_column(
        &self,
        id: Uuid,
        column: &str,
        value: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE users SET {} = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            column, ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(value)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }
}

#[async_trait::async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_identifier(
        &self,
        lookup: &AccountLookup,
    ) -> Result<Option<Account>, StoreError> {
        if lookup.is_empty() {
            return Ok(None);
        }

        // NULL never compares equal, so an absent identifier matches nothing
        let query = format!(
            "SELECT {} FROM users WHERE user_name = $1 OR email = $2 LIMIT 1",
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(lookup.user_name.as_deref())
            .bind(lookup.email.as_deref())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", ACCOUNT_COLUMNS);

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        self.update_column(id, "refresh_token", refresh_token).await
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO users (id, user_name, email, full_name, avatar, cover_image,
                               password_hash, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $8)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(Uuid::new_v4())
            .bind(&new.user_name)
            .bind(&new.email)
            .bind(&new.full_name)
            .bind(&new.avatar)
            .bind(&new.cover_image)
            .bind(&new.password_hash)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(user_id = %account.id, "Account row created");
        Ok(account)
    }

    async fn update_details(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let query = format!(
            "UPDATE users SET full_name = $2, email = $3, updated_at = $4 \
             WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(full_name)
            .bind(email)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.update_column(id, "password_hash", Some(password_hash)).await
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, StoreError> {
        self.update_column(id, "avatar", Some(url)).await
    }

    async fn set_cover_image(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.update_column(id, "cover_image", Some(url)).await
    }
}
