//! Adapters for the services a dispatched job talks to: the Docker Engine
//! API on each worker, and the HTTP log sink named in each request.

pub mod docker;
pub mod remote_logger;

pub use docker::{DockerConnector, DockerRuntime};
pub use remote_logger::{HttpRemoteLogger, HttpRemoteLoggerFactory};
