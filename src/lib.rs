//! Sandworm runs container images on a fixed pool of Docker endpoints.
//!
//! Requests arrive over HTTP, wait in a FIFO queue, and are matched one by
//! one to idle endpoints. Each matched job pulls its image, runs it with the
//! job's log endpoint as its only argument, and reports progress to that
//! endpoint until the container exits.

pub mod app;
pub mod shutdown;

pub use app::Application;
pub use shutdown::ShutdownManager;
