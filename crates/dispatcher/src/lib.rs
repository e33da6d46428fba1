//! Dispatch engine
//!
//! Matches queued run requests to idle container-runtime endpoints and
//! drives each dispatched job through pull, run and wait on its own task.

pub mod dispatcher;
pub mod lifecycle;
pub mod pool;
pub mod queue;

pub use dispatcher::{DispatchEvent, DispatchSnapshot, Dispatcher, DispatcherHandle};
pub use lifecycle::Lifecycle;
pub use pool::{ReleaseOutcome, WorkerPool};
pub use queue::ExecutionQueue;
