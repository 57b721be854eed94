//! Trigger worker
//!
//! Consumes reconcile triggers from a channel and runs one invocation per
//! trigger against a fresh record snapshot. Delivery is at least once and
//! unordered across records; the pipeline's idempotent guards make replays
//! harmless. A requeued invocation is redelivered after a delay, and a
//! periodic resync re-enqueues every incomplete record so job completion is
//! eventually observed.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use dispatch_core::domain::request::CompletionEvent;

use crate::reconcile::{Collaborators, ReconcileOutcome, Reconciler};

/// A reconcile trigger for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub request_id: Uuid,
}

/// Worker that drives reconciliation from a trigger channel
pub struct Worker {
    deps: Collaborators,
    triggers: mpsc::UnboundedReceiver<Trigger>,
    /// Sender side of the same channel, used for requeues and resync.
    resend: mpsc::UnboundedSender<Trigger>,
    requeue_delay: Duration,
    resync_interval: Duration,
}

impl Worker {
    pub fn new(
        deps: Collaborators,
        triggers: mpsc::UnboundedReceiver<Trigger>,
        resend: mpsc::UnboundedSender<Trigger>,
        requeue_delay: Duration,
        resync_interval: Duration,
    ) -> Self {
        Self {
            deps,
            triggers,
            resend,
            requeue_delay,
            resync_interval,
        }
    }

    /// Runs until the trigger channel closes.
    pub async fn run(mut self) {
        info!(
            "Starting controller worker (resync interval: {:?})",
            self.resync_interval
        );

        let resync = self.start_resync_loop();

        while let Some(trigger) = self.triggers.recv().await {
            self.handle_trigger(trigger).await;
        }

        resync.abort();
        info!("Trigger channel closed, worker stopping");
    }

    async fn handle_trigger(&self, trigger: Trigger) {
        debug!("Reconciling request {}", trigger.request_id);

        let record = match self.deps.store.get(trigger.request_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                // The caller deleted the record; nothing left to reconcile.
                debug!("Request {} no longer exists", trigger.request_id);
                return;
            }
            Err(e) => {
                warn!("Failed to fetch request {}: {:#}", trigger.request_id, e);
                self.requeue_later(trigger);
                return;
            }
        };

        match Reconciler::new(record, self.deps.clone()).reconcile().await {
            ReconcileOutcome::Done => {}
            ReconcileOutcome::Requeue => self.requeue_later(trigger),
        }
    }

    /// Redelivers a trigger after the configured delay.
    fn requeue_later(&self, trigger: Trigger) {
        let resend = self.resend.clone();
        let delay = self.requeue_delay;

        tokio::spawn(async move {
            time::sleep(delay).await;
            let _ = resend.send(trigger);
        });
    }

    /// Periodically re-enqueues all incomplete records. This is how the
    /// worker notices job completion without a push channel from the engine.
    fn start_resync_loop(&self) -> tokio::task::JoinHandle<()> {
        let store = self.deps.store.clone();
        let resend = self.resend.clone();
        let interval = self.resync_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // The immediate first tick would race server startup for nothing.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                match store.list_incomplete().await {
                    Ok(records) => {
                        if !records.is_empty() {
                            debug!("Resyncing {} incomplete request(s)", records.len());
                        }
                        for record in records {
                            let _ = resend.send(Trigger {
                                request_id: record.id,
                            });
                        }
                    }
                    Err(e) => warn!("Resync listing failed: {:#}", e),
                }
            }
        })
    }
}

/// Drains completion events and logs them. Stands in for a metrics sink;
/// losing an event never affects the record.
pub fn spawn_event_logger(
    mut events: mpsc::UnboundedReceiver<CompletionEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let duration = match (event.start_time, event.completion_time) {
                (Some(start), Some(end)) => Some(end.signed_duration_since(start)),
                _ => None,
            };

            info!(
                request = %event.request_id,
                job = %event.requested_job,
                requester = %event.requester,
                reason = ?event.reason,
                duration = ?duration,
                "Request completed"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dispatch_core::domain::job::{JobHandle, JobOutcome, JobSpec, JobTemplate};
    use dispatch_core::domain::request::Request;
    use std::sync::Arc;

    use crate::config::{ConfigLoader, ControllerConfig};
    use crate::engine::{EngineError, JobEngine};
    use crate::store::{RequestStore, StoreError, TemplateResolver};

    struct EmptyStore;

    #[async_trait]
    impl RequestStore for EmptyStore {
        async fn get(&self, _id: Uuid) -> Result<Option<Request>, StoreError> {
            Ok(None)
        }

        async fn update_status(&self, _request: &Request) -> Result<(), StoreError> {
            Ok(())
        }

        async fn list_incomplete(&self) -> Result<Vec<Request>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct NoTemplates;

    #[async_trait]
    impl TemplateResolver for NoTemplates {
        async fn resolve(&self, _name: &str) -> Result<Option<JobTemplate>, StoreError> {
            Ok(None)
        }
    }

    struct NoEngine;

    #[async_trait]
    impl JobEngine for NoEngine {
        async fn find_job(&self, _name: &str) -> Result<Option<JobHandle>, EngineError> {
            Ok(None)
        }

        async fn create_job(&self, spec: JobSpec) -> Result<JobHandle, EngineError> {
            Ok(JobHandle { name: spec.name })
        }

        async fn observe_job(&self, handle: &JobHandle) -> Result<JobOutcome, EngineError> {
            Err(EngineError::NotFound(handle.name.clone()))
        }

        async fn delete_job(&self, _handle: &JobHandle) -> Result<(), EngineError> {
            Ok(())
        }
    }

    struct DefaultConfig;

    #[async_trait]
    impl ConfigLoader for DefaultConfig {
        async fn load(&self) -> anyhow::Result<ControllerConfig> {
            Ok(ControllerConfig::default())
        }
    }

    #[tokio::test]
    async fn test_worker_ignores_deleted_records_and_stops_on_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let deps = Collaborators {
            store: Arc::new(EmptyStore),
            config: Arc::new(DefaultConfig),
            templates: Arc::new(NoTemplates),
            engine: Arc::new(NoEngine),
            events: None,
        };

        let worker = Worker::new(
            deps,
            rx,
            tx.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
        );
        let handle = tokio::spawn(worker.run());

        tx.send(Trigger {
            request_id: Uuid::new_v4(),
        })
        .unwrap();

        // Closing the channel ends the run loop.
        drop(tx);
        handle.await.unwrap();
    }
}
