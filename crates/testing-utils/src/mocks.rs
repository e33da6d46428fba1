//! In-memory stand-ins for the container runtime and the remote log sink.
//!
//! `ScriptedConnector` plays a whole pool of runtime endpoints. Each image
//! gets a `JobScript` deciding how its pull and run phases end, and the
//! connector keeps enough bookkeeping to check that no worker is ever
//! driven by two jobs at once.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use sandworm_domain::{
    ContainerHandle, ContainerRuntime, PullProgress, PullStream, RemoteLogger,
    RemoteLoggerFactory, RuntimeConnector, WaitStatus, WaitStream, WorkerId,
};
use sandworm_errors::{SchedulerError, SchedulerResult};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobScript {
    /// Pull and run succeed; the container exits with this code.
    Exit(i64),
    /// The pull call itself is refused.
    RejectPull(String),
    /// The pull stream reports an error after some progress.
    FailPull(String),
    FailCreate(String),
    FailStart(String),
    /// The wait stream reports an error.
    FailWait(String),
    /// The container runs until `ScriptedConnector::finish` is called for
    /// its image, then exits with this code.
    Hold(i64),
}

impl Default for JobScript {
    fn default() -> Self {
        JobScript::Exit(0)
    }
}

/// One pull issued against a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRecord {
    pub image: String,
    pub registry_url: String,
    pub worker: WorkerId,
}

#[derive(Default)]
struct EngineState {
    scripts: Mutex<HashMap<String, JobScript>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    refused: Mutex<HashSet<WorkerId>>,
    active: Mutex<HashSet<WorkerId>>,
    pulls: Mutex<Vec<PullRecord>>,
    containers: Mutex<HashMap<String, (String, Vec<String>)>>,
    violations: AtomicUsize,
    peak_active: AtomicUsize,
    next_container: AtomicUsize,
}

impl EngineState {
    fn script(&self, image: &str) -> JobScript {
        self.scripts
            .lock()
            .unwrap()
            .get(image)
            .cloned()
            .unwrap_or_default()
    }

    fn gate(&self, image: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(image.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    fn occupy(&self, worker: &WorkerId) {
        let mut active = self.active.lock().unwrap();
        if !active.insert(worker.clone()) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.peak_active.fetch_max(active.len(), Ordering::SeqCst);
    }

    fn vacate(&self, worker: &WorkerId) {
        self.active.lock().unwrap().remove(worker);
    }

    fn image_of(&self, container: &ContainerHandle) -> String {
        self.containers
            .lock()
            .unwrap()
            .get(&container.id)
            .map(|(image, _)| image.clone())
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<EngineState>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, image: &str, script: JobScript) -> Self {
        self.set_script(image, script);
        self
    }

    pub fn set_script(&self, image: &str, script: JobScript) {
        self.state
            .scripts
            .lock()
            .unwrap()
            .insert(image.to_string(), script);
    }

    /// Refuse to build a client for `worker`, as if its address were unusable.
    pub fn refuse(&self, worker: &WorkerId) {
        self.state.refused.lock().unwrap().insert(worker.clone());
    }

    /// Let one held container of `image` exit.
    pub fn finish(&self, image: &str) {
        self.state.gate(image).notify_one();
    }

    pub fn pulls(&self) -> Vec<PullRecord> {
        self.state.pulls.lock().unwrap().clone()
    }

    pub fn worker_for(&self, image: &str) -> Option<WorkerId> {
        self.pulls()
            .into_iter()
            .find(|p| p.image == image)
            .map(|p| p.worker)
    }

    /// Arguments each container of `image` was created with.
    pub fn container_args(&self, image: &str) -> Vec<Vec<String>> {
        self.state
            .containers
            .lock()
            .unwrap()
            .values()
            .filter(|(i, _)| i == image)
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub fn active_workers(&self) -> usize {
        self.state.active.lock().unwrap().len()
    }

    /// Times a worker was handed to a job while another job still held it.
    pub fn violations(&self) -> usize {
        self.state.violations.load(Ordering::SeqCst)
    }

    pub fn peak_active(&self) -> usize {
        self.state.peak_active.load(Ordering::SeqCst)
    }
}

impl RuntimeConnector for ScriptedConnector {
    fn connect(
        &self,
        worker: &WorkerId,
        registry_url: &str,
    ) -> SchedulerResult<Arc<dyn ContainerRuntime>> {
        if self.state.refused.lock().unwrap().contains(worker) {
            return Err(SchedulerError::runtime_error(format!(
                "cannot connect to {worker}"
            )));
        }
        self.state.occupy(worker);
        Ok(Arc::new(ScriptedRuntime {
            state: Arc::clone(&self.state),
            worker: worker.clone(),
            registry_url: registry_url.to_string(),
        }))
    }
}

pub struct ScriptedRuntime {
    state: Arc<EngineState>,
    worker: WorkerId,
    registry_url: String,
}

#[async_trait::async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn pull_image(&self, image: &str, registry_url: &str) -> SchedulerResult<PullStream> {
        self.state.pulls.lock().unwrap().push(PullRecord {
            image: image.to_string(),
            registry_url: registry_url.to_string(),
            worker: self.worker.clone(),
        });

        let from = format!("Pulling from {}/{image}", self.registry_url);
        match self.state.script(image) {
            JobScript::RejectPull(reason) => {
                self.state.vacate(&self.worker);
                Err(SchedulerError::image_pull(image, reason))
            }
            JobScript::FailPull(reason) => {
                self.state.vacate(&self.worker);
                let events = vec![
                    Ok(PullProgress::new(from)),
                    Err(SchedulerError::image_pull(image, reason)),
                ];
                Ok(stream::iter(events).boxed())
            }
            _ => {
                let events = vec![
                    Ok(PullProgress::new(from)),
                    Ok(PullProgress::new("Download complete").with_detail("[=====>]")),
                    Ok(PullProgress::new(format!(
                        "Status: Downloaded newer image for {image}"
                    ))),
                ];
                Ok(stream::iter(events).boxed())
            }
        }
    }

    async fn create_container(
        &self,
        image: &str,
        args: &[String],
    ) -> SchedulerResult<ContainerHandle> {
        if let JobScript::FailCreate(reason) = self.state.script(image) {
            self.state.vacate(&self.worker);
            return Err(SchedulerError::runtime_error(reason));
        }
        let n = self.state.next_container.fetch_add(1, Ordering::SeqCst);
        let handle = ContainerHandle::new(format!("ctr-{n}"));
        self.state
            .containers
            .lock()
            .unwrap()
            .insert(handle.id.clone(), (image.to_string(), args.to_vec()));
        Ok(handle)
    }

    async fn start_container(&self, container: &ContainerHandle) -> SchedulerResult<()> {
        let image = self.state.image_of(container);
        if let JobScript::FailStart(reason) = self.state.script(&image) {
            self.state.vacate(&self.worker);
            return Err(SchedulerError::runtime_error(reason));
        }
        Ok(())
    }

    async fn wait_container(&self, container: &ContainerHandle) -> SchedulerResult<WaitStream> {
        let image = self.state.image_of(container);
        match self.state.script(&image) {
            JobScript::FailWait(reason) => {
                self.state.vacate(&self.worker);
                Ok(stream::iter(vec![Err(SchedulerError::runtime_error(reason))]).boxed())
            }
            JobScript::Hold(code) => {
                let gate = self.state.gate(&image);
                let state = Arc::clone(&self.state);
                let worker = self.worker.clone();
                Ok(stream::once(async move {
                    gate.notified().await;
                    state.vacate(&worker);
                    Ok(WaitStatus::exited(code))
                })
                .boxed())
            }
            JobScript::Exit(code) => {
                self.state.vacate(&self.worker);
                Ok(stream::iter(vec![Ok(WaitStatus::exited(code))]).boxed())
            }
            other => Err(SchedulerError::internal(format!(
                "wait reached with script {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub endpoint: String,
    pub tag: String,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct RecordingLoggerFactory {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingLoggerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn tags_for(&self, endpoint: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.endpoint == endpoint)
            .map(|e| e.tag)
            .collect()
    }

    pub fn messages_for(&self, endpoint: &str, tag: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.endpoint == endpoint && e.tag == tag)
            .map(|e| e.message)
            .collect()
    }
}

impl RemoteLoggerFactory for RecordingLoggerFactory {
    fn open(&self, logging_endpoint: &str) -> Arc<dyn RemoteLogger> {
        Arc::new(RecordingLogger {
            endpoint: logging_endpoint.to_string(),
            entries: Arc::clone(&self.entries),
        })
    }
}

pub struct RecordingLogger {
    endpoint: String,
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RemoteLogger for RecordingLogger {
    fn log(&self, tag: &str, message: &str) {
        self.entries.lock().unwrap().push(LogEntry {
            endpoint: self.endpoint.clone(),
            tag: tag.to_string(),
            message: message.to_string(),
        });
    }
}
