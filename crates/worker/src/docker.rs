use std::sync::Arc;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerWaitResponse, CreateImageInfo};
use bollard::{ClientVersion, Docker, API_DEFAULT_VERSION};
use futures::StreamExt;
use tracing::debug;

use sandworm_config::RuntimeConfig;
use sandworm_domain::{
    qualified_image, ContainerHandle, ContainerRuntime, PullProgress, PullStream,
    RuntimeConnector, SchedulerError, SchedulerResult, WaitStatus, WaitStream, WorkerId,
};

/// Builds one Docker Engine client per dispatched job.
#[derive(Debug, Clone)]
pub struct DockerConnector {
    timeout_seconds: u64,
    api_version: Option<(usize, usize)>,
}

impl DockerConnector {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            timeout_seconds: config.connect_timeout_seconds,
            api_version: config.parsed_api_version(),
        }
    }

    fn client_version(&self) -> ClientVersion {
        match self.api_version {
            Some((major_version, minor_version)) => ClientVersion {
                major_version,
                minor_version,
            },
            None => ClientVersion {
                major_version: API_DEFAULT_VERSION.major_version,
                minor_version: API_DEFAULT_VERSION.minor_version,
            },
        }
    }
}

impl RuntimeConnector for DockerConnector {
    fn connect(
        &self,
        worker: &WorkerId,
        registry_url: &str,
    ) -> SchedulerResult<Arc<dyn ContainerRuntime>> {
        let address = http_address(worker);
        debug!(worker = %worker, address = %address, "Connecting to Docker endpoint");

        let docker = Docker::connect_with_http(&address, self.timeout_seconds, &self.client_version())
            .map_err(|e| docker_error(&format!("cannot connect to {worker}"), e))?;

        Ok(Arc::new(DockerRuntime::new(docker, registry_url)))
    }
}

/// Docker Engine client bound to one worker and one registry.
pub struct DockerRuntime {
    docker: Docker,
    registry_url: String,
}

impl DockerRuntime {
    pub fn new(docker: Docker, registry_url: impl Into<String>) -> Self {
        Self {
            docker,
            registry_url: registry_url.into(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str, registry_url: &str) -> SchedulerResult<PullStream> {
        let reference = qualified_image(registry_url, image);
        let options = CreateImageOptions {
            from_image: reference.clone(),
            ..Default::default()
        };

        let stream = self
            .docker
            .create_image(Some(options), None, None)
            .map(move |item| {
                item.map(pull_progress)
                    .map_err(|e| SchedulerError::image_pull(&reference, e.to_string()))
            })
            .boxed();
        Ok(stream)
    }

    async fn create_container(
        &self,
        image: &str,
        args: &[String],
    ) -> SchedulerResult<ContainerHandle> {
        let config = Config {
            image: Some(qualified_image(&self.registry_url, image)),
            cmd: Some(args.to_vec()),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| docker_error("create container failed", e))?;

        for warning in &response.warnings {
            debug!(container = %response.id, warning = %warning, "Docker warning");
        }
        Ok(ContainerHandle::new(response.id))
    }

    async fn start_container(&self, container: &ContainerHandle) -> SchedulerResult<()> {
        self.docker
            .start_container(&container.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| docker_error("start container failed", e))
    }

    async fn wait_container(&self, container: &ContainerHandle) -> SchedulerResult<WaitStream> {
        let stream = self
            .docker
            .wait_container(&container.id, None::<WaitContainerOptions<String>>)
            .map(wait_status)
            .boxed();
        Ok(stream)
    }
}

/// `tcp://host:port` is how workers are configured; the HTTP transport wants `http://`.
pub fn http_address(worker: &WorkerId) -> String {
    match worker.as_str().strip_prefix("tcp://") {
        Some(rest) => format!("http://{rest}"),
        None => worker.to_string(),
    }
}

fn pull_progress(info: CreateImageInfo) -> PullProgress {
    let status = info
        .status
        .or(info.id)
        .unwrap_or_else(|| "pulling".to_string());
    PullProgress {
        status,
        detail: info.progress,
    }
}

/// A container exiting non-zero is reported by the engine as an error; it is
/// still a finished container, so it becomes a status.
fn wait_status(item: Result<ContainerWaitResponse, DockerError>) -> SchedulerResult<WaitStatus> {
    match item {
        Ok(response) => Ok(WaitStatus {
            status_code: response.status_code,
            error: response.error.and_then(|e| e.message),
        }),
        Err(DockerError::DockerContainerWaitError { error, code }) => Ok(WaitStatus {
            status_code: code,
            error: Some(error).filter(|e| !e.is_empty()),
        }),
        Err(e) => Err(docker_error("wait failed", e)),
    }
}

fn docker_error(context: &str, e: DockerError) -> SchedulerError {
    SchedulerError::runtime_error(format!("{context}: {e}"))
}
