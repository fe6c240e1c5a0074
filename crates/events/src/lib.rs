//! GeoSense status propagation infrastructure.
//!
//! Two deliberately separate tiers:
//!
//! - [`StatusBus`] -- the delivery channel. Producers (the dispatcher, the
//!   worker status callback) publish [`TaskStatusEvent`]s; consumers hold a
//!   broadcast receiver. Backed by `tokio::sync::broadcast` in a single
//!   process; the membership tier below does not change if this is swapped
//!   for an external broker topic.
//! - [`SubscriptionRegistry`] -- the membership tier. Maps task ids to the
//!   connection ids that declared interest, so the notification bridge can
//!   fan one event out to exactly the connections watching that task.

pub mod bus;
pub mod registry;

pub use bus::{StatusBus, TaskStatusEvent};
pub use registry::SubscriptionRegistry;
