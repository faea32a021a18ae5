//! Confirm and cancel token lifecycle.
//!
//! Tokens move through `issued -> (valid | expired) -> redeemed`. Nothing
//! here deletes an expired token; it simply stops verifying.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use uuid::Uuid;

use skymail_core::storage::{RepositoryError, Resolver};
use skymail_core::subscription::{
    generate_code, is_token_expired, token_expiry, Cadence, Subscription, Token, TokenError,
    TokenKind,
};

/// Attempts at finding a code not already held by another user.
const MAX_CODE_ATTEMPTS: usize = 3;

/// Issues, verifies, and redeems tokens against the store.
pub struct TokenLifecycle {
    store: Arc<dyn Resolver>,
}

impl TokenLifecycle {
    pub fn new(store: Arc<dyn Resolver>) -> Self {
        Self { store }
    }

    /// Issues a confirm token for `cadence`, retiring the user's previous one.
    pub async fn issue_confirm(&self, user_id: Uuid, cadence: Cadence) -> Result<Token, TokenError> {
        self.issue(TokenKind::Confirm, |code, issued_at| {
            Token::confirm(
                code,
                user_id,
                cadence,
                token_expiry(TokenKind::Confirm, issued_at),
            )
        })
        .await
    }

    /// Issues a cancel token, retiring the user's previous one.
    pub async fn issue_cancel(&self, user_id: Uuid) -> Result<Token, TokenError> {
        self.issue(TokenKind::Cancel, |code, issued_at| {
            Token::cancel(code, user_id, token_expiry(TokenKind::Cancel, issued_at))
        })
        .await
    }

    async fn issue<F>(&self, kind: TokenKind, build: F) -> Result<Token, TokenError>
    where
        F: Fn(String, DateTime<Utc>) -> Token + Send + Sync,
    {
        let mut attempt = 1;
        loop {
            let token = build(generate_code(&mut OsRng)?, Utc::now());

            match self.store.replace_token(&token).await {
                Ok(retired) => {
                    tracing::debug!(
                        user_id = %token.user_id,
                        %kind,
                        retired = retired.is_some(),
                        "Token issued"
                    );
                    return Ok(token);
                }
                Err(RepositoryError::AlreadyExists { .. }) if attempt < MAX_CODE_ATTEMPTS => {
                    tracing::debug!(%kind, attempt, "Token code collision, regenerating");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Looks a token up and checks that it has not expired.
    pub async fn verify(&self, value: &str) -> Result<Token, TokenError> {
        let token = self
            .store
            .get_token(value)
            .await?
            .ok_or(TokenError::NotFound)?;

        if is_token_expired(&token, Utc::now()) {
            return Err(TokenError::Expired);
        }
        Ok(token)
    }

    fn require_kind(token: &Token, expected: TokenKind) -> Result<(), TokenError> {
        if token.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: token.kind,
            });
        }
        Ok(())
    }

    /// Turns a confirm token into a subscription with the token's cadence.
    ///
    /// The subscription save and the token removal are both attempted; the
    /// first failure is returned.
    pub async fn redeem_confirm(&self, value: &str) -> Result<Subscription, TokenError> {
        let token = self.verify(value).await?;
        Self::require_kind(&token, TokenKind::Confirm)?;

        let cadence = token.cadence.ok_or_else(|| {
            RepositoryError::InvalidData(format!("confirm token for {} has no cadence", token.user_id))
        })?;
        let subscription = Subscription::new(token.user_id, cadence);

        let saved = self.store.save_subscription(&subscription).await;
        let removed = self.store.delete_token(&token.value).await;
        saved?;
        removed?;

        tracing::info!(
            user_id = %subscription.user_id,
            %cadence,
            "Subscription confirmed"
        );
        Ok(subscription)
    }

    /// Redeems a cancel token by removing its user and everything the user
    /// owns.
    pub async fn redeem_cancel(&self, value: &str) -> Result<(), TokenError> {
        let token = self.verify(value).await?;
        Self::require_kind(&token, TokenKind::Cancel)?;

        let user_removed = match self.store.delete_user(token.user_id).await {
            Err(err) if err.is_not_found() => Ok(()),
            other => other,
        };
        // Usually already gone through the user cascade.
        let token_removed = match self.store.delete_token(&token.value).await {
            Err(err) if err.is_not_found() => Ok(()),
            other => other,
        };
        user_removed?;
        token_removed?;

        tracing::info!(user_id = %token.user_id, "User unsubscribed");
        Ok(())
    }
}
