use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sandworm_domain::{
    tags, ExecutionRecord, RemoteLoggerFactory, RuntimeConnector, SchedulerError, SchedulerResult,
    WorkerId,
};

use crate::lifecycle::Lifecycle;
use crate::pool::{ReleaseOutcome, WorkerPool};
use crate::queue::ExecutionQueue;

const EVENT_CAPACITY: usize = 1024;

enum Command {
    Submit(ExecutionRecord),
    Release(WorkerId),
    Snapshot(oneshot::Sender<DispatchSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Point-in-time view of the dispatcher's state.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSnapshot {
    pub queued: Vec<ExecutionRecord>,
    pub idle: Vec<WorkerId>,
    pub busy: Vec<WorkerId>,
    pub running: usize,
}

/// Broadcast for observers; the dispatcher never waits on receivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Queued { job_id: Uuid, image: String },
    Dispatched { job_id: Uuid, image: String, worker: WorkerId },
    Released { worker: WorkerId },
}

/// Owns the execution queue and the worker pool.
///
/// Every command is handled to completion before the next one is read, so
/// the match-and-pop loop in `drain` never interleaves with another submit
/// or release. Jobs themselves run on their own tasks.
pub struct Dispatcher {
    queue: ExecutionQueue,
    pool: WorkerPool,
    connector: Arc<dyn RuntimeConnector>,
    logger_factory: Arc<dyn RemoteLoggerFactory>,
    handle: DispatcherHandle,
}

impl Dispatcher {
    /// Start the dispatcher task. Must be called within a tokio runtime.
    pub fn spawn(
        workers: impl IntoIterator<Item = WorkerId>,
        connector: Arc<dyn RuntimeConnector>,
        logger_factory: Arc<dyn RemoteLoggerFactory>,
        buffer: usize,
    ) -> DispatcherHandle {
        let (commands_tx, commands_rx) = mpsc::channel(buffer.max(1));
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let handle = DispatcherHandle {
            commands: commands_tx,
            events: events_tx,
        };

        let dispatcher = Self {
            queue: ExecutionQueue::new(),
            pool: WorkerPool::new(workers),
            connector,
            logger_factory,
            handle: handle.clone(),
        };
        tokio::spawn(dispatcher.run(commands_rx));

        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(workers = self.pool.idle_count(), "Dispatcher started");

        while let Some(command) = commands.recv().await {
            match command {
                Command::Submit(record) => {
                    debug!(job_id = %record.id, image = %record.image, "Execution queued");
                    self.handle.publish(DispatchEvent::Queued {
                        job_id: record.id,
                        image: record.image.clone(),
                    });
                    self.queue.push(record);
                    self.drain();
                }
                Command::Release(worker) => {
                    self.release(worker);
                    self.drain();
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Shutdown(ack) => {
                    info!(
                        queued = self.queue.len(),
                        running = self.pool.busy_count(),
                        "Dispatcher shutting down"
                    );
                    let _ = ack.send(());
                    break;
                }
            }
        }

        info!("Dispatcher stopped");
    }

    fn release(&mut self, worker: WorkerId) {
        match self.pool.release(worker.clone()) {
            ReleaseOutcome::Returned => {
                info!(worker = %worker, "Worker released");
                self.handle.publish(DispatchEvent::Released { worker });
            }
            ReleaseOutcome::AlreadyIdle => {
                warn!(worker = %worker, "Worker is already idle, ignoring release");
            }
            ReleaseOutcome::Adopted => {
                warn!(worker = %worker, "Released worker was not busy, adding it to the pool");
                self.handle.publish(DispatchEvent::Released { worker });
            }
        }
    }

    fn drain(&mut self) {
        info!(
            queued = self.queue.len(),
            idle = self.pool.idle_count(),
            "Dispatch cycle"
        );

        loop {
            if self.pool.is_empty() {
                info!("no available workers, skipping");
                break;
            }
            if self.queue.is_empty() {
                info!("nothing to execute, skipping");
                break;
            }
            let (Some(worker), Some(record)) = (self.pool.take(), self.queue.pop()) else {
                break;
            };
            self.dispatch(record, worker);
        }
    }

    fn dispatch(&mut self, record: ExecutionRecord, worker: WorkerId) {
        info!(
            job_id = %record.id,
            worker = %worker,
            image = %record.image,
            "Dispatching execution"
        );
        self.handle.publish(DispatchEvent::Dispatched {
            job_id: record.id,
            image: record.image.clone(),
            worker: worker.clone(),
        });

        let logger = self.logger_factory.open(&record.logging_endpoint);
        match self.connector.connect(&worker, &record.registry_url) {
            Ok(runtime) => {
                Lifecycle::new(record, worker, runtime, logger).spawn(self.handle.clone());
            }
            Err(e) => {
                // No client means no pull; the worker is withheld like any pull failure.
                error!(
                    job_id = %record.id,
                    worker = %worker,
                    error = %e,
                    "Failed to connect to worker"
                );
                logger.log(
                    tags::PULL_ERROR,
                    &format!(
                        "Error pulling image {} from {}: {e}",
                        record.image, record.registry_url
                    ),
                );
            }
        }
    }

    fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            queued: self.queue.to_vec(),
            idle: self.pool.idle(),
            busy: self.pool.busy(),
            running: self.pool.busy_count(),
        }
    }
}

/// Message-passing front of a running `Dispatcher`.
#[derive(Clone)]
pub struct DispatcherHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<DispatchEvent>,
}

impl DispatcherHandle {
    /// Queue a run request and trigger dispatch. Returns the id used in logs.
    pub async fn submit(
        &self,
        registry_url: impl Into<String>,
        image: impl Into<String>,
        logging_endpoint: impl Into<String>,
    ) -> SchedulerResult<Uuid> {
        let record = ExecutionRecord::new(registry_url, image, logging_endpoint);
        let id = record.id;
        self.send(Command::Submit(record)).await?;
        Ok(id)
    }

    pub async fn release(&self, worker: WorkerId) -> SchedulerResult<()> {
        self.send(Command::Release(worker)).await
    }

    pub async fn snapshot(&self) -> SchedulerResult<DispatchSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| SchedulerError::DispatcherUnavailable)
    }

    /// Stop the dispatcher. Jobs already dispatched keep running.
    pub async fn shutdown(&self) -> SchedulerResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| SchedulerError::DispatcherUnavailable)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn publish(&self, event: DispatchEvent) {
        let _ = self.events.send(event);
    }

    async fn send(&self, command: Command) -> SchedulerResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SchedulerError::DispatcherUnavailable)
    }
}
