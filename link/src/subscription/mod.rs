//! Subscription lifecycle.
//!
//! - [`Subscription`] / [`SubscriptionHandle`]: what the caller holds
//! - [`SubscriptionRegistry`]: id → cancellation handle, for targeted and
//!   bulk teardown
//! - `coordinator`: validation, connection, registration and pump spawn
//! - `pump`: per-subscription task forwarding pushed messages

mod coordinator;
mod handle;
mod pump;
mod registry;

pub(crate) use coordinator::SubscriptionCoordinator;
pub use handle::{Subscription, SubscriptionHandle, ERROR_CHANNEL_CAPACITY};
pub use registry::{ReleaseHook, SubscriptionRegistry};
