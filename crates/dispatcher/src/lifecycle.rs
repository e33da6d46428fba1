//! Pull, run and wait for one dispatched job.

use std::sync::Arc;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument, Level};

use sandworm_domain::{
    tags, ContainerHandle, ContainerRuntime, ExecutionRecord, LifecyclePhase, LifecycleState,
    RemoteLogger, SchedulerError, SchedulerResult, WorkerId,
};

use crate::dispatcher::DispatcherHandle;

/// One job bound to one worker, its runtime client and its remote logger.
pub struct Lifecycle {
    record: ExecutionRecord,
    worker: WorkerId,
    runtime: Arc<dyn ContainerRuntime>,
    logger: Arc<dyn RemoteLogger>,
}

impl Lifecycle {
    pub fn new(
        record: ExecutionRecord,
        worker: WorkerId,
        runtime: Arc<dyn ContainerRuntime>,
        logger: Arc<dyn RemoteLogger>,
    ) -> Self {
        Self {
            record,
            worker,
            runtime,
            logger,
        }
    }

    /// Run on a new task and hand the worker back once the job is over,
    /// unless the pull failed.
    pub fn spawn(self, dispatcher: DispatcherHandle) -> JoinHandle<LifecycleState> {
        let span = info_span!(
            "lifecycle",
            job_id = %self.record.id,
            worker = %self.worker,
            image = %self.record.image
        );

        tokio::spawn(
            async move {
                let worker = self.worker.clone();
                let state = self.run().await;

                if state.releases_worker() {
                    if let Err(e) = dispatcher.release(worker).await {
                        warn!(error = %e, "Could not release worker");
                    }
                } else {
                    warn!(state = state.name(), "Worker withheld from the pool");
                }
                state
            }
            .instrument(span),
        )
    }

    /// Drive the job to a terminal state.
    pub async fn run(self) -> LifecycleState {
        match self.drive().await {
            Ok(state) => {
                info!(state = state.name(), "Lifecycle finished");
                state
            }
            Err(e) => {
                error!(error = %e, "Lifecycle aborted");
                LifecycleState::Failed {
                    phase: LifecyclePhase::Run,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn drive(&self) -> SchedulerResult<LifecycleState> {
        let state = LifecycleState::Pulling;
        if let Err(reason) = self.pull().await {
            return state.on_pull_error(reason);
        }

        let state = state.on_pull_complete()?;
        let container = match self.start().await {
            Ok(container) => container,
            Err(reason) => return state.on_run_error(reason),
        };

        let state = state.on_container_started(container.clone())?;
        match self.wait(&container).await {
            Ok(status_code) => state.on_wait_complete(status_code),
            Err(reason) => state.on_run_error(reason),
        }
    }

    async fn pull(&self) -> Result<(), String> {
        let image = &self.record.image;
        let registry = &self.record.registry_url;
        self.emit(Level::INFO, tags::PULL, format!("Pulling image {image} from {registry}"));

        let mut progress = match self.runtime.pull_image(image, registry).await {
            Ok(stream) => stream,
            Err(e) => return Err(self.pull_failed(e)),
        };
        self.emit(Level::DEBUG, tags::PULL_START, format!("Starting pull of {image}"));

        let outcome = loop {
            match progress.next().await {
                Some(Ok(event)) => self.emit(Level::DEBUG, tags::PULL_NEXT, event.message()),
                Some(Err(e)) => break Err(self.pull_failed(e)),
                None => {
                    self.emit(Level::INFO, tags::PULL_DONE, format!("Done pulling {image}"));
                    break Ok(());
                }
            }
        };

        self.emit(Level::DEBUG, tags::PULL_CLOSE, format!("Closed {image}"));
        outcome
    }

    async fn start(&self) -> Result<ContainerHandle, String> {
        let args = vec![self.record.logging_endpoint.clone()];
        let container = self
            .runtime
            .create_container(&self.record.image, &args)
            .await
            .map_err(|e| self.run_failed(None, e))?;

        self.runtime
            .start_container(&container)
            .await
            .map_err(|e| self.run_failed(Some(&container), e))?;

        self.emit(
            Level::INFO,
            tags::RUN_START,
            format!("Container {container} has started"),
        );
        Ok(container)
    }

    async fn wait(&self, container: &ContainerHandle) -> Result<Option<i64>, String> {
        let mut statuses = self
            .runtime
            .wait_container(container)
            .await
            .map_err(|e| self.run_failed(Some(container), e))?;

        let mut status_code = None;
        let outcome = loop {
            match statuses.next().await {
                Some(Ok(status)) => {
                    let level = if status.is_success() {
                        Level::INFO
                    } else {
                        Level::WARN
                    };
                    self.emit(level, tags::RUN_NEXT, format!("{container} - {}", status.status_code));
                    if let Some(reason) = &status.error {
                        warn!(container = %container, error = %reason, "Container reported an error");
                    }
                    status_code = Some(status.status_code);
                }
                Some(Err(e)) => break Err(self.run_failed(Some(container), e)),
                None => {
                    self.emit(
                        Level::INFO,
                        tags::RUN_COMPLETE,
                        format!("Container {container} has finished"),
                    );
                    break Ok(status_code);
                }
            }
        };

        self.emit(Level::DEBUG, tags::RUN_CLOSE, format!("Closed {container}"));
        outcome
    }

    fn pull_failed(&self, e: SchedulerError) -> String {
        let reason = e.to_string();
        self.emit(
            Level::ERROR,
            tags::PULL_ERROR,
            format!(
                "Error pulling image {} from {}: {reason}",
                self.record.image, self.record.registry_url
            ),
        );
        reason
    }

    fn run_failed(&self, container: Option<&ContainerHandle>, e: SchedulerError) -> String {
        let reason = e.to_string();
        let subject = match container {
            Some(container) => format!("Container {container}"),
            None => format!("Container for {}", self.record.image),
        };
        self.emit(Level::ERROR, tags::RUN_ERROR, format!("{subject} error - {reason}"));
        reason
    }

    /// Console line plus remote log line for one lifecycle event.
    fn emit(&self, level: Level, tag: &str, message: String) {
        if level == Level::ERROR {
            error!(tag, "{message}");
        } else if level == Level::WARN {
            warn!(tag, "{message}");
        } else if level == Level::INFO {
            info!(tag, "{message}");
        } else {
            debug!(tag, "{message}");
        }
        self.logger.log(tag, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandworm_domain::RemoteLoggerFactory;
    use sandworm_domain::RuntimeConnector;
    use sandworm_testing_utils::{
        log_endpoint, record, worker_ids, JobScript, RecordingLoggerFactory, ScriptedConnector,
    };

    async fn run_job(connector: &ScriptedConnector, logs: &RecordingLoggerFactory, image: &str) -> LifecycleState {
        let record = record(image);
        let worker = worker_ids(1).remove(0);
        let runtime = connector.connect(&worker, &record.registry_url).unwrap();
        let logger = logs.open(&record.logging_endpoint);
        Lifecycle::new(record, worker, runtime, logger).run().await
    }

    #[tokio::test]
    async fn test_successful_job_emits_every_tag_in_order() {
        let connector = ScriptedConnector::new();
        let logs = RecordingLoggerFactory::new();

        let state = run_job(&connector, &logs, "app").await;

        assert!(matches!(
            state,
            LifecycleState::Completed { status_code: Some(0), .. }
        ));
        assert!(state.releases_worker());
        assert_eq!(
            logs.tags_for(&log_endpoint("app")),
            vec![
                tags::PULL,
                tags::PULL_START,
                tags::PULL_NEXT,
                tags::PULL_NEXT,
                tags::PULL_NEXT,
                tags::PULL_DONE,
                tags::PULL_CLOSE,
                tags::RUN_START,
                tags::RUN_NEXT,
                tags::RUN_COMPLETE,
                tags::RUN_CLOSE,
            ]
        );
    }

    #[tokio::test]
    async fn test_container_gets_logging_endpoint_as_argument() {
        let connector = ScriptedConnector::new();
        let logs = RecordingLoggerFactory::new();

        run_job(&connector, &logs, "app").await;

        assert_eq!(connector.container_args("app"), vec![vec![log_endpoint("app")]]);
        assert_eq!(connector.pulls()[0].registry_url, sandworm_testing_utils::TEST_REGISTRY);
    }

    #[tokio::test]
    async fn test_pull_stream_error_is_terminal_and_withholds_worker() {
        let connector = ScriptedConnector::new()
            .with_script("broken", JobScript::FailPull("manifest unknown".to_string()));
        let logs = RecordingLoggerFactory::new();

        let state = run_job(&connector, &logs, "broken").await;

        assert!(matches!(
            state,
            LifecycleState::Failed { phase: LifecyclePhase::Pull, .. }
        ));
        assert!(!state.releases_worker());
        let emitted = logs.tags_for(&log_endpoint("broken"));
        assert!(emitted.contains(&tags::PULL_ERROR.to_string()));
        assert!(!emitted.contains(&tags::PULL_DONE.to_string()));
        assert!(!emitted.iter().any(|t| t.starts_with("scheduler/run")));

        let errors = logs.messages_for(&log_endpoint("broken"), tags::PULL_ERROR);
        assert!(errors[0].contains("manifest unknown"));
        assert!(errors[0].starts_with("Error pulling image broken from"));
    }

    #[tokio::test]
    async fn test_rejected_pull_call_is_a_pull_failure() {
        let connector =
            ScriptedConnector::new().with_script("denied", JobScript::RejectPull("denied".to_string()));
        let logs = RecordingLoggerFactory::new();

        let state = run_job(&connector, &logs, "denied").await;

        assert!(matches!(
            state,
            LifecycleState::Failed { phase: LifecyclePhase::Pull, .. }
        ));
        assert_eq!(
            logs.tags_for(&log_endpoint("denied")),
            vec![tags::PULL, tags::PULL_ERROR]
        );
    }

    #[tokio::test]
    async fn test_create_and_start_failures_are_run_errors() {
        let connector = ScriptedConnector::new()
            .with_script("no-create", JobScript::FailCreate("no such image".to_string()))
            .with_script("no-start", JobScript::FailStart("port in use".to_string()));
        let logs = RecordingLoggerFactory::new();

        for image in ["no-create", "no-start"] {
            let state = run_job(&connector, &logs, image).await;
            assert!(matches!(
                state,
                LifecycleState::Failed { phase: LifecyclePhase::Run, .. }
            ));
            assert!(state.releases_worker());
            let emitted = logs.tags_for(&log_endpoint(image));
            assert_eq!(emitted.last().map(String::as_str), Some(tags::RUN_ERROR));
            assert!(!emitted.contains(&tags::RUN_START.to_string()));
        }
    }

    #[tokio::test]
    async fn test_wait_error_releases_and_closes() {
        let connector =
            ScriptedConnector::new().with_script("crash", JobScript::FailWait("connection reset".to_string()));
        let logs = RecordingLoggerFactory::new();

        let state = run_job(&connector, &logs, "crash").await;

        assert!(state.releases_worker());
        let emitted = logs.tags_for(&log_endpoint("crash"));
        assert!(emitted.ends_with(&[tags::RUN_ERROR.to_string(), tags::RUN_CLOSE.to_string()]));
        let errors = logs.messages_for(&log_endpoint("crash"), tags::RUN_ERROR);
        assert!(errors[0].contains("connection reset"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_still_completes() {
        let connector = ScriptedConnector::new().with_script("fails", JobScript::Exit(3));
        let logs = RecordingLoggerFactory::new();

        let state = run_job(&connector, &logs, "fails").await;

        assert!(matches!(
            state,
            LifecycleState::Completed { status_code: Some(3), .. }
        ));
        let statuses = logs.messages_for(&log_endpoint("fails"), tags::RUN_NEXT);
        assert_eq!(statuses, vec!["ctr-0 - 3".to_string()]);
    }
}
