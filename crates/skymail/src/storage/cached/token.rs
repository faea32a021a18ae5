//! Cached token lookups with compare-and-swap replacement.

use async_trait::async_trait;
use uuid::Uuid;

use skymail_core::storage::{Resolver, Result, TokenRepository};
use skymail_core::subscription::{Token, TokenKind};

use super::store::CachedStore;

impl<R: Resolver> CachedStore<R> {
    /// Indexes a token read from the store under its value and its
    /// (user, kind) slot. A slot holding a different token is dropped
    /// rather than overwritten.
    fn index_token(&self, token: &Token) {
        self.tokens_by_value.put(token.value.clone(), token.clone());
        self.swap_owner_slot(token, None);
    }

    /// Installs `token` in its (user, kind) slot only if the slot is empty,
    /// still holds the token the store just retired, or already holds
    /// `token`. Otherwise another replacement won the race, and the slot is
    /// dropped so the next read goes back to the store.
    fn swap_owner_slot(&self, token: &Token, retired: Option<&Token>) -> bool {
        let key = (token.user_id, token.kind);
        let mut slots = self.tokens_by_owner.lock();

        let installable = match slots.peek(&key) {
            None => true,
            Some(current) => {
                current.value == token.value || retired.is_some_and(|r| r.value == current.value)
            }
        };

        if installable {
            slots.put(key, token.clone());
        } else {
            slots.pop(&key);
        }
        installable
    }
}

#[async_trait]
impl<R> TokenRepository for CachedStore<R>
where
    R: Resolver + 'static,
{
    async fn get_token(&self, value: &str) -> Result<Option<Token>> {
        if let Some(token) = self.tokens_by_value.get(value) {
            tracing::trace!(user_id = %token.user_id, kind = %token.kind, "Cache hit for token");
            return Ok(Some(token));
        }

        tracing::trace!("Cache miss for token");
        let observed = self.generation();
        let token = self.resolver.get_token(value).await?;
        if let Some(ref t) = token {
            if !self.fill_if_current(observed, || self.index_token(t)) {
                tracing::trace!(
                    user_id = %t.user_id,
                    kind = %t.kind,
                    "Skipped filling token raced by a write"
                );
            }
        }
        Ok(token)
    }

    async fn get_token_for_user(&self, user_id: Uuid, kind: TokenKind) -> Result<Option<Token>> {
        if let Some(token) = self.tokens_by_owner.get(&(user_id, kind)) {
            tracing::trace!(user_id = %user_id, kind = %kind, "Cache hit for user token");
            return Ok(Some(token));
        }

        tracing::trace!(user_id = %user_id, kind = %kind, "Cache miss for user token");
        let observed = self.generation();
        let token = self.resolver.get_token_for_user(user_id, kind).await?;
        if let Some(ref t) = token {
            if !self.fill_if_current(observed, || self.index_token(t)) {
                tracing::trace!(
                    user_id = %user_id,
                    kind = %kind,
                    "Skipped filling token raced by a write"
                );
            }
        }
        Ok(token)
    }

    async fn replace_token(&self, token: &Token) -> Result<Option<Token>> {
        let retired = self.resolver.replace_token(token).await?;

        let installed = self.after_write(|| {
            if let Some(ref r) = retired {
                self.tokens_by_value.pop(&r.value);
            }
            self.tokens_by_value.put(token.value.clone(), token.clone());
            self.swap_owner_slot(token, retired.as_ref())
        });

        if !installed {
            tracing::warn!(
                user_id = %token.user_id,
                kind = %token.kind,
                "Concurrent token replacement detected, dropping cached slot"
            );
        }

        tracing::debug!(
            user_id = %token.user_id,
            kind = %token.kind,
            retired = retired.is_some(),
            "Token replaced"
        );
        Ok(retired)
    }

    async fn delete_token(&self, value: &str) -> Result<()> {
        self.resolver.delete_token(value).await?;

        self.after_write(|| match self.tokens_by_value.pop(value) {
            Some(token) => {
                let key = (token.user_id, token.kind);
                let mut slots = self.tokens_by_owner.lock();
                if slots.peek(&key).is_some_and(|t| t.value == value) {
                    slots.pop(&key);
                }
            }
            None => {
                self.tokens_by_owner.pop_where(|t| t.value == value);
            }
        });

        tracing::debug!("Token deleted");
        Ok(())
    }
}
