//! Subscriptions for observing store mutations.
//!
//! Each store owns a [`SubscriptionManager`] over its own event type and
//! broadcasts synchronously at the end of every state-changing mutation.
//! Subscribers receive events over a bounded channel; a subscriber that
//! stops draining its channel is dropped rather than blocking the store.

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{SubscriptionConfig, SubscriptionHandle, SubscriptionId};
