//! Cached subscription lookups.

use async_trait::async_trait;
use uuid::Uuid;

use skymail_core::storage::{Resolver, Result, SubscriptionRepository};
use skymail_core::subscription::{Cadence, Subscription};

use super::store::CachedStore;

#[async_trait]
impl<R> SubscriptionRepository for CachedStore<R>
where
    R: Resolver + 'static,
{
    async fn get_subscription_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>> {
        if let Some(subscription) = self.subscriptions_by_user.get(&user_id) {
            tracing::trace!(user_id = %user_id, "Cache hit for subscription");
            return Ok(Some(subscription));
        }

        tracing::trace!(user_id = %user_id, "Cache miss for subscription");
        let observed = self.generation();
        let subscription = self.resolver.get_subscription_for_user(user_id).await?;
        if let Some(ref s) = subscription {
            let filled = self.fill_if_current(observed, || {
                self.subscriptions_by_user.put(user_id, s.clone());
            });
            if !filled {
                tracing::trace!(
                    user_id = %user_id,
                    "Skipped filling subscription raced by a write"
                );
            }
        }
        Ok(subscription)
    }

    /// Always reads from the store: membership must be authoritative at
    /// dispatch time.
    async fn list_subscriptions(&self, cadence: Cadence) -> Result<Vec<Subscription>> {
        let subscriptions = self.resolver.list_subscriptions(cadence).await?;
        tracing::trace!(%cadence, count = subscriptions.len(), "Listed subscriptions from store");
        Ok(subscriptions)
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.resolver.save_subscription(subscription).await?;
        self.after_write(|| {
            self.subscriptions_by_user
                .put(subscription.user_id, subscription.clone());
        });

        tracing::debug!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            cadence = %subscription.cadence,
            "Subscription saved"
        );
        Ok(())
    }

    async fn delete_subscription(&self, id: Uuid) -> Result<()> {
        self.resolver.delete_subscription(id).await?;
        self.after_write(|| self.subscriptions_by_user.pop_where(|s| s.id == id));

        tracing::debug!(subscription_id = %id, "Subscription deleted");
        Ok(())
    }
}
