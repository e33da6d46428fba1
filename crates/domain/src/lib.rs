pub mod entities;
pub mod lifecycle;
pub mod ports;
pub mod value_objects;

pub use entities::*;
pub use lifecycle::*;
pub use ports::*;
pub use sandworm_errors::{SchedulerError, SchedulerResult};
pub use value_objects::*;
