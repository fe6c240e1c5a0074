//! Asynchronous task dispatch engine.
//!
//! [`TaskDispatcher`] hands submissions to the external algorithm service
//! off the request path, with preflight health checking and bounded retry.
//! All task-state writes go through the [`TaskStore`] seam so the engine
//! can be exercised without a database.

mod dispatcher;
mod store;

pub use dispatcher::{DispatchConfig, TaskDispatcher};
pub use store::{PgTaskStore, StoreError, TaskStore};
