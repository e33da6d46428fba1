//! Interfaces of the external collaborators the dispatcher drives.

pub mod logging;
pub mod runtime;

pub use logging::*;
pub use runtime::*;
