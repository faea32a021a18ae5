//! Business services composed over the store and external collaborators.

mod dispatcher;
mod subscriptions;
mod tokens;
mod weather;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use subscriptions::SubscriptionOrchestrator;
pub use tokens::TokenLifecycle;
pub use weather::WeatherService;
