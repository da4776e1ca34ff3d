/// Session Management
///
/// Login, refresh and logout on top of the account store and `TokenCodec`.
///
/// Each account holds at most one refresh token. A refresh token is usable only
/// if it verifies *and* equals the stored value, so:
/// - login overwrites any earlier session (at most one session per account)
/// - refresh rotates: the presented token is superseded by the new one
/// - logout clears the stored value, killing every outstanding refresh token
///
/// Expiry is checked at verification time only; the stored value is never
/// cleared because it aged out. Nothing here retries: issuing and rotating
/// have side effects and must not be applied twice.

use std::sync::Arc;
use uuid::Uuid;

use crate::auth::claims::TokenClass;
use crate::auth::jwt::{TokenCodec, TokenError};
use crate::error::AuthError;
use crate::store::{Account, AccountLookup, AccountStore};

/// Access and refresh token minted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
}

impl SessionManager {
    pub fn new(store: Arc<dyn AccountStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate by user name or email and open a session
    ///
    /// Returns the account as stored after the new refresh token was written.
    ///
    /// # Errors
    /// - `NotFound` if no account matches
    /// - `InvalidCredentials` if the password check fails (nothing is written)
    /// - `Upstream` if the store fails
    pub async fn login(
        &self,
        lookup: &AccountLookup,
        password: &str,
    ) -> Result<(Account, TokenPair), AuthError> {
        let account = self
            .store
            .find_by_identifier(lookup)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !account.is_password_correct(password).await {
            tracing::warn!(user_id = %account.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let (account, tokens) = self.issue_and_store(account.id).await?;

        tracing::info!(user_id = %account.id, "Session opened");
        Ok((account, tokens))
    }

    /// Exchange a refresh token for a new pair, rotating the stored token
    ///
    /// # Errors
    /// `Unauthorized` when the token is absent, fails verification, names an
    /// unknown account, or is not the account's current refresh token.
    /// `Upstream` if the store fails.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::Unauthorized("missing refresh token".to_string()))?;

        let subject_id = self
            .codec
            .verify(presented, TokenClass::Refresh)
            .map_err(|e: TokenError| {
                tracing::warn!(error = %e, "Refresh token failed verification");
                AuthError::Unauthorized(e.to_string())
            })?;

        let account = self
            .store
            .find_by_id(subject_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %subject_id, "Refresh token names unknown account");
                AuthError::Unauthorized("invalid refresh token".to_string())
            })?;

        if account.refresh_token.as_deref() != Some(presented) {
            // Superseded by a later rotation, or the account logged out
            tracing::warn!(user_id = %subject_id, "Refresh token is not the active one");
            return Err(AuthError::Unauthorized(
                "refresh token is expired or used".to_string(),
            ));
        }

        let (_, tokens) = self.issue_and_store(account.id).await?;

        tracing::info!(user_id = %subject_id, "Refresh token rotated");
        Ok(tokens)
    }

    /// Close the account's session. Idempotent.
    pub async fn logout(&self, subject_id: Uuid) -> Result<(), AuthError> {
        match self.store.set_refresh_token(subject_id, None).await? {
            Some(_) => tracing::info!(user_id = %subject_id, "Session closed"),
            None => tracing::debug!(user_id = %subject_id, "Logout for unknown account"),
        }
        Ok(())
    }

    /// Mint a pair and make its refresh half the account's only valid one
    async fn issue_and_store(&self, account_id: Uuid) -> Result<(Account, TokenPair), AuthError> {
        let access_token = self
            .codec
            .issue(account_id, TokenClass::Access)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;
        let refresh_token = self
            .codec
            .issue(account_id, TokenClass::Refresh)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        let account = self
            .store
            .set_refresh_token(account_id, Some(&refresh_token))
            .await?
            .ok_or_else(|| AuthError::Unauthorized("account no longer exists".to_string()))?;

        Ok((
            account,
            TokenPair {
                access_token,
                refresh_token,
            },
        ))
    }
}
