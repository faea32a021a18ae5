//! Cached user lookups and cascading user removal.

use async_trait::async_trait;
use uuid::Uuid;

use skymail_core::storage::{Resolver, Result, UserRepository};
use skymail_core::subscription::{TokenKind, User};

use super::store::CachedStore;

impl<R: Resolver> CachedStore<R> {
    fn index_user(&self, user: &User) {
        if let Some(previous) = self.users_by_id.pop(&user.id) {
            if previous.email != user.email {
                self.users_by_email.pop(&previous.email);
            }
        }
        self.users_by_id.put(user.id, user.clone());
        self.users_by_email.put(user.email.clone(), user.clone());
    }

    /// Drops every index entry that exists because of the user.
    fn purge_user(&self, id: Uuid) {
        if let Some(user) = self.users_by_id.pop(&id) {
            self.users_by_email.pop(&user.email);
        }
        self.users_by_email.pop_where(|u| u.id == id);
        self.subscriptions_by_user.pop(&id);
        self.tokens_by_owner.pop(&(id, TokenKind::Confirm));
        self.tokens_by_owner.pop(&(id, TokenKind::Cancel));
        self.tokens_by_value.pop_where(|t| t.user_id == id);
    }
}

#[async_trait]
impl<R> UserRepository for CachedStore<R>
where
    R: Resolver + 'static,
{
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        if let Some(user) = self.users_by_id.get(&id) {
            tracing::trace!(user_id = %id, "Cache hit for user");
            return Ok(Some(user));
        }

        tracing::trace!(user_id = %id, "Cache miss for user");
        let observed = self.generation();
        let user = self.resolver.get_user(id).await?;
        if let Some(ref u) = user {
            if !self.fill_if_current(observed, || self.index_user(u)) {
                tracing::trace!(user_id = %id, "Skipped filling user raced by a write");
            }
        }
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        if let Some(user) = self.users_by_email.get(email) {
            tracing::trace!(user_id = %user.id, "Cache hit for user email");
            return Ok(Some(user));
        }

        tracing::trace!("Cache miss for user email");
        let observed = self.generation();
        let user = self.resolver.get_user_by_email(email).await?;
        if let Some(ref u) = user {
            if !self.fill_if_current(observed, || self.index_user(u)) {
                tracing::trace!(user_id = %u.id, "Skipped filling user raced by a write");
            }
        }
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.resolver.save_user(user).await?;
        self.after_write(|| self.index_user(user));

        tracing::debug!(user_id = %user.id, city_id = %user.city_id, "User saved");
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.resolver.delete_user(id).await?;
        self.after_write(|| self.purge_user(id));

        tracing::debug!(user_id = %id, "User deleted");
        Ok(())
    }
}
