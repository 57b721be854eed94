//! Reconciliation pipeline
//!
//! One invocation walks a fixed sequence of steps over one record snapshot.
//! Each step either continues, stops the invocation, or asks for a requeue;
//! unexpected errors are logged and requeued. All steps are idempotent, so a
//! trigger replayed after a crash or delivered twice converges on the same
//! record state and exactly one engine job.

use dispatch_core::domain::job::{JobHandle, JobOutcome, JobTemplate};
use dispatch_core::domain::request::{CompletionEvent, Request};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::auth::{self, Decision};
use crate::config::{ConfigLoader, ControllerConfig};
use crate::correlator::Correlator;
use crate::engine::{EngineError, JobEngine};
use crate::store::{RequestStore, StoreError, TemplateResolver};

/// Bound on the config load itself; every later call uses the loaded
/// `call_timeout`.
const CONFIG_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Directive returned by a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Proceed to the next step.
    Continue,
    /// Halt this invocation; a future trigger resumes the sequence.
    Stop,
    /// Halt and schedule a retry of the whole pipeline.
    Requeue,
}

/// Aggregate result of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Done,
    Requeue,
}

/// Errors surfaced by individual steps
///
/// The interpreter never inspects these beyond logging; any step error is
/// treated as transient and requeued.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("step ordering violated: {0}")]
    Ordering(&'static str),
}

/// Ordered reconciliation steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsureNotCompleted,
    EnsureConfigLoaded,
    EnsureRequestAllowed,
    EnsureTemplateExists,
    EnsureJobCreated,
    EnsureStatusTracked,
    EnsureJobDeleted,
}

impl Step {
    /// The pipeline order. No step is skipped except by short-circuit.
    pub const SEQUENCE: [Step; 7] = [
        Step::EnsureNotCompleted,
        Step::EnsureConfigLoaded,
        Step::EnsureRequestAllowed,
        Step::EnsureTemplateExists,
        Step::EnsureJobCreated,
        Step::EnsureStatusTracked,
        Step::EnsureJobDeleted,
    ];
}

/// Shared collaborators handed to every invocation
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RequestStore>,
    pub config: Arc<dyn ConfigLoader>,
    pub templates: Arc<dyn TemplateResolver>,
    pub engine: Arc<dyn JobEngine>,
    /// Best-effort completion notifications. Send failures are ignored and
    /// never affect the status write they follow.
    pub events: Option<mpsc::UnboundedSender<CompletionEvent>>,
}

/// One reconciliation invocation over one record snapshot
pub struct Reconciler {
    request: Request,
    deps: Collaborators,
    // Working state attached by earlier steps for later ones.
    config: Option<ControllerConfig>,
    template: Option<JobTemplate>,
    job: Option<JobHandle>,
}

impl Reconciler {
    pub fn new(request: Request, deps: Collaborators) -> Self {
        Self {
            request,
            deps,
            config: None,
            template: None,
            job: None,
        }
    }

    /// Runs the step sequence, short-circuiting on the first non-Continue
    /// directive. Step errors are logged and classified as Requeue.
    pub async fn reconcile(mut self) -> ReconcileOutcome {
        for step in Step::SEQUENCE {
            match self.run_step(step).await {
                Ok(StepOutcome::Continue) => {}
                Ok(StepOutcome::Stop) => return ReconcileOutcome::Done,
                Ok(StepOutcome::Requeue) => return ReconcileOutcome::Requeue,
                Err(e) => {
                    tracing::error!(
                        request = %self.request.id,
                        step = ?step,
                        "Reconciliation step failed: {:#}",
                        e
                    );
                    return ReconcileOutcome::Requeue;
                }
            }
        }

        ReconcileOutcome::Done
    }

    /// Dispatches a single step. Public so each step stays testable in
    /// isolation.
    pub async fn run_step(&mut self, step: Step) -> Result<StepOutcome, StepError> {
        match step {
            Step::EnsureNotCompleted => self.ensure_not_completed(),
            Step::EnsureConfigLoaded => self.ensure_config_loaded().await,
            Step::EnsureRequestAllowed => self.ensure_request_allowed().await,
            Step::EnsureTemplateExists => self.ensure_template_exists().await,
            Step::EnsureJobCreated => self.ensure_job_created().await,
            Step::EnsureStatusTracked => self.ensure_status_tracked().await,
            Step::EnsureJobDeleted => self.ensure_job_deleted().await,
        }
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Terminal records are immutable; a duplicate trigger ends here without
    /// touching any collaborator.
    fn ensure_not_completed(&mut self) -> Result<StepOutcome, StepError> {
        if self.request.has_completed() {
            tracing::debug!(request = %self.request.id, "Request already completed");
            return Ok(StepOutcome::Stop);
        }

        Ok(StepOutcome::Continue)
    }

    async fn ensure_config_loaded(&mut self) -> Result<StepOutcome, StepError> {
        let loaded = timeout(CONFIG_LOAD_TIMEOUT, self.deps.config.load()).await;

        match loaded {
            Ok(Ok(config)) => {
                self.config = Some(config);
                Ok(StepOutcome::Continue)
            }
            Ok(Err(e)) => {
                tracing::warn!(request = %self.request.id, "Config load failed: {:#}", e);
                Ok(StepOutcome::Requeue)
            }
            Err(_) => {
                tracing::warn!(request = %self.request.id, "Config load timed out");
                Ok(StepOutcome::Requeue)
            }
        }
    }

    async fn ensure_request_allowed(&mut self) -> Result<StepOutcome, StepError> {
        let config = self.loaded_config()?;

        match auth::evaluate(&self.request.spec.requested_job, &self.request.requester, config) {
            Decision::Allowed => Ok(StepOutcome::Continue),
            Decision::Denied(reason) => {
                tracing::info!(
                    request = %self.request.id,
                    requester = %self.request.requester,
                    "Request rejected: {}",
                    reason
                );
                self.request.mark_rejected(reason);
                self.persist_status().await?;
                Ok(StepOutcome::Stop)
            }
        }
    }

    async fn ensure_template_exists(&mut self) -> Result<StepOutcome, StepError> {
        let call_timeout = self.loaded_config()?.call_timeout;
        let name = self.request.spec.requested_job.clone();

        let resolved = timeout(call_timeout, self.deps.templates.resolve(&name))
            .await
            .map_err(|_| StoreError::Timeout)??;

        match resolved {
            Some(template) => {
                self.template = Some(template);
                Ok(StepOutcome::Continue)
            }
            None => {
                tracing::info!(request = %self.request.id, "No job template named {}", name);
                self.request.mark_failed("job template not found");
                self.persist_status().await?;
                Ok(StepOutcome::Stop)
            }
        }
    }

    async fn ensure_job_created(&mut self) -> Result<StepOutcome, StepError> {
        let correlator = self.correlator()?;
        let template = self
            .template
            .as_ref()
            .ok_or(StepError::Ordering("template not resolved"))?;

        let handle = correlator.ensure_created(&self.request, template).await?;
        self.job = Some(handle);

        self.request.mark_running();
        self.persist_status().await?;

        Ok(StepOutcome::Continue)
    }

    async fn ensure_status_tracked(&mut self) -> Result<StepOutcome, StepError> {
        let correlator = self.correlator()?;
        let handle = self
            .job
            .as_ref()
            .ok_or(StepError::Ordering("job handle not attached"))?;

        match correlator.observe(handle).await? {
            JobOutcome::Pending | JobOutcome::Running => {
                // Nothing to record; the next trigger picks the job back up.
                Ok(StepOutcome::Stop)
            }
            JobOutcome::Succeeded { results } => {
                self.request.status.results = results;
                let event = self.request.mark_succeeded();
                self.persist_status().await?;
                self.emit(event);
                Ok(StepOutcome::Continue)
            }
            JobOutcome::Failed { reason } => {
                let event = self.request.mark_failed(reason);
                self.persist_status().await?;
                self.emit(event);
                Ok(StepOutcome::Continue)
            }
        }
    }

    async fn ensure_job_deleted(&mut self) -> Result<StepOutcome, StepError> {
        let config = self.loaded_config()?;

        if !self.request.has_completed() {
            return Ok(StepOutcome::Stop);
        }

        if config.keep_jobs {
            tracing::debug!(request = %self.request.id, "Keeping finished job");
            return Ok(StepOutcome::Stop);
        }

        if !self.retention_elapsed() {
            return Ok(StepOutcome::Requeue);
        }

        let handle = self
            .job
            .as_ref()
            .ok_or(StepError::Ordering("job handle not attached"))?;

        self.correlator()?.delete(handle).await?;
        tracing::info!(request = %self.request.id, "Deleted job {}", handle.name);

        Ok(StepOutcome::Stop)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn loaded_config(&self) -> Result<&ControllerConfig, StepError> {
        self.config
            .as_ref()
            .ok_or(StepError::Ordering("config not loaded"))
    }

    fn correlator(&self) -> Result<Correlator, StepError> {
        let call_timeout = self.loaded_config()?.call_timeout;
        Ok(Correlator::new(self.deps.engine.clone(), call_timeout))
    }

    fn retention_elapsed(&self) -> bool {
        let Some(completed) = self.request.status.completion_time else {
            // Rejected records have no job and never reach this step.
            return true;
        };

        let retention = self.loaded_config().map(|c| c.job_retention);
        let elapsed = chrono::Utc::now()
            .signed_duration_since(completed)
            .to_std()
            .unwrap_or_default();

        retention.map(|r| elapsed >= r).unwrap_or(true)
    }

    /// Persists the record's status. Co-varying fields (condition,
    /// timestamps, results) always travel in this single write.
    async fn persist_status(&self) -> Result<(), StepError> {
        let call_timeout = self.loaded_config()?.call_timeout;

        timeout(call_timeout, self.deps.store.update_status(&self.request))
            .await
            .map_err(|_| StoreError::Timeout)??;

        Ok(())
    }

    /// Forwards a completion event, if one was produced. Best-effort.
    fn emit(&self, event: Option<CompletionEvent>) {
        if let (Some(tx), Some(event)) = (&self.deps.events, event) {
            let _ = tx.send(event);
        }
    }
}
