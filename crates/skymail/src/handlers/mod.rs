pub mod error;
pub mod health;
pub mod subscriptions;
pub mod weather;

pub use error::AppError;
