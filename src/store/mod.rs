/// Account store
///
/// The account record and the operations the rest of the service needs from
/// whatever holds it. Every call is atomic for a single record; nothing here
/// spans more than one record.

mod memory;
mod postgres;

pub use memory::InMemoryAccountStore;
pub use postgres::PgAccountStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::verify_password_blocking;
use crate::error::StoreError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
    /// The single active refresh token, if a session is open
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub async fn is_password_correct(&self, password: &str) -> bool {
        verify_password_blocking(password.to_string(), self.password_hash.clone()).await
    }

    /// View of the account safe to return to clients
    pub fn public_view(&self) -> PublicAccount {
        PublicAccount {
            id: self.id.to_string(),
            user_name: self.user_name.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }
}

/// Account fields exposed over HTTP; never carries the hash or refresh token
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq)]
pub struct PublicAccount {
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    /// Hosted URL of the avatar; every account has one
    pub avatar: String,
    pub cover_image: String,
    pub password_hash: String,
}

/// Login identifier; an account matches if either field matches
#[derive(Debug, Clone, Default)]
pub struct AccountLookup {
    pub user_name: Option<String>,
    pub email: Option<String>,
}

impl AccountLookup {
    pub fn new(user_name: Option<&str>, email: Option<&str>) -> Self {
        let clean = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            user_name: clean(user_name).map(|u| u.to_lowercase()),
            email: clean(email),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.email.is_none()
    }

    pub fn matches(&self, account: &Account) -> bool {
        self.user_name.as_deref() == Some(account.user_name.as_str())
            || self.email.as_deref() == Some(account.email.as_str())
    }
}

#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// First account whose user name or email matches the lookup
    async fn find_by_identifier(&self, lookup: &AccountLookup)
        -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Overwrite (or clear, with `None`) the stored refresh token.
    /// Returns the updated account, or `None` if no account has this id.
    async fn set_refresh_token(
        &self,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<Option<Account>, StoreError>;

    /// Fails with `UniqueConstraintViolation` if the user name or email is taken
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn update_details(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, StoreError>;

    async fn set_cover_image(&self, id: Uuid, url: &str)
        -> Result<Option<Account>, StoreError>;
}
