//! # Sandworm Testing Utils
//!
//! Shared test doubles for the dispatcher workspace: a scripted container
//! runtime that stands in for a pool of Docker endpoints, a remote logger
//! that records every line, builders, and polling helpers.
//!
//! ```toml
//! [dev-dependencies]
//! sandworm-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
