use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{Account, AccountLookup, AccountStore, NewAccount};
use crate::error::StoreError;

/// Process-local account store
///
/// Each operation holds the lock for its whole read-modify-write, which gives
/// the same per-record atomicity as a single database statement.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unexpected("account map lock poisoned".to_string()))
    }

    fn modify<F>(&self, id: Uuid, f: F) -> Result<Option<Account>, StoreError>
    where
        F: FnOnce(&mut Account),
    {
        let mut accounts = self.lock()?;
        Ok(accounts.get_mut(&id).map(|account| {
            f(account);
            account.updated_at = Utc::now();
            account.clone()
        }))
    }
}

#[async_trait::async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_identifier(
        &self,
        lookup: &AccountLookup,
    ) -> Result<Option<Account>, StoreError> {
        if lookup.is_empty() {
            return Ok(None);
        }
        let accounts = self.lock()?;
        Ok(accounts.values().find(|a| lookup.matches(a)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn set_refresh_token(
        &self,
        id: Uuid,
        refresh_token: Option<&str>,
    ) -> Result<Option<Account>, StoreError> {
        self.modify(id, |account| {
            account.refresh_token = refresh_token.map(str::to_string);
        })
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.lock()?;
        let taken = accounts
            .values()
            .any(|a| a.user_name == new.user_name || a.email == new.email);
        if taken {
            return Err(StoreError::UniqueConstraintViolation(
                "user name or email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_name: new.user_name,
            email: new.email,
            full_name: new.full_name,
            avatar: new.avatar,
            cover_image: new.cover_image,
            password_hash: new.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_details(
        &self,
        id: Uuid,
        full_name: &str,
        email: &str,
    ) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.lock()?;
        if accounts.values().any(|a| a.id != id && a.email == email) {
            return Err(StoreError::UniqueConstraintViolation(
                "email already exists".to_string(),
            ));
        }
        Ok(accounts.get_mut(&id).map(|account| {
            account.full_name = full_name.to_string();
            account.email = email.to_string();
            account.updated_at = Utc::now();
            account.clone()
        }))
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.modify(id, |account| account.password_hash = password_hash.to_string())
    }

    async fn set_avatar(&self, id: Uuid, url: &str) -> Result<Option<Account>, StoreError> {
        self.modify(id, |account| account.avatar = url.to_string())
    }

    async fn set_cover_image(
        &self,
        id: Uuid,
        url: &str,
    ) -> Result<Option<Account>, StoreError> {
        self.modify(id, |account| account.cover_image = url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(user_name: &str, email: &str) -> NewAccount {
        NewAccount {
            user_name: user_name.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            avatar: "https://media.test/avatar.png".to_string(),
            cover_image: String::new(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = InMemoryAccountStore::new();
        let created = store.create(new_account("alice", "alice@example.com")).await.unwrap();

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.user_name, "alice");
        assert!(by_id.refresh_token.is_none());

        let lookup = AccountLookup::new(None, Some("alice@example.com"));
        let by_email = store.find_by_identifier(&lookup).await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_user_name_or_email_is_rejected() {
        let store = InMemoryAccountStore::new();
        store.create(new_account("alice", "alice@example.com")).await.unwrap();

        let same_name = store.create(new_account("alice", "other@example.com")).await;
        let same_email = store.create(new_account("bob", "alice@example.com")).await;

        assert!(matches!(same_name, Err(StoreError::UniqueConstraintViolation(_))));
        assert!(matches!(same_email, Err(StoreError::UniqueConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_set_and_clear_refresh_token() {
        let store = InMemoryAccountStore::new();
        let created = store.create(new_account("alice", "alice@example.com")).await.unwrap();

        let updated = store.set_refresh_token(created.id, Some("token-1")).await.unwrap();
        assert_eq!(updated.unwrap().refresh_token.as_deref(), Some("token-1"));

        let cleared = store.set_refresh_token(created.id, None).await.unwrap();
        assert!(cleared.unwrap().refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_updates_on_unknown_id_return_none() {
        let store = InMemoryAccountStore::new();

        assert!(store.set_refresh_token(Uuid::new_v4(), None).await.unwrap().is_none());
        assert!(store.set_avatar(Uuid::new_v4(), "url").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_details_rejects_taken_email() {
        let store = InMemoryAccountStore::new();
        let alice = store.create(new_account("alice", "alice@example.com")).await.unwrap();
        store.create(new_account("bob", "bob@example.com")).await.unwrap();

        let result = store.update_details(alice.id, "Alice", "bob@example.com").await;
        assert!(matches!(result, Err(StoreError::UniqueConstraintViolation(_))));

        let updated = store
            .update_details(alice.id, "Alice A.", "alice@example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Alice A.");
        assert_eq!(updated.email, "alice@example.org");
    }
}
