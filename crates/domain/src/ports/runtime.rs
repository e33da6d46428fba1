use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use sandworm_errors::SchedulerResult;

use crate::entities::{PullProgress, WaitStatus};
use crate::value_objects::{ContainerHandle, WorkerId};

/// Progress stream of an image pull. The stream ending without an error
/// item is a successful pull.
pub type PullStream = BoxStream<'static, SchedulerResult<PullProgress>>;

/// Status stream of a container wait. The stream ending without an error
/// item means the container has finished.
pub type WaitStream = BoxStream<'static, SchedulerResult<WaitStatus>>;

/// Client for a single container-runtime endpoint.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str, registry_url: &str) -> SchedulerResult<PullStream>;

    async fn create_container(&self, image: &str, args: &[String])
        -> SchedulerResult<ContainerHandle>;

    async fn start_container(&self, container: &ContainerHandle) -> SchedulerResult<()>;

    async fn wait_container(&self, container: &ContainerHandle) -> SchedulerResult<WaitStream>;
}

/// Builds a fresh runtime client bound to one worker for one job.
pub trait RuntimeConnector: Send + Sync {
    fn connect(
        &self,
        worker: &WorkerId,
        registry_url: &str,
    ) -> SchedulerResult<Arc<dyn ContainerRuntime>>;
}
