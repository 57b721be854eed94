//! Job correlator
//!
//! Associates a request record with exactly one engine job. The association
//! is the deterministically derived job name, never a stored pointer: it
//! survives process restarts and doubles as the create-if-absent guard that
//! makes concurrent reconciliation safe without a lock.

use dispatch_core::domain::job::{JobHandle, JobOutcome, JobSpec, JobTemplate};
use dispatch_core::domain::request::Request;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::engine::{EngineError, JobEngine};

/// Derives the job name for a record
///
/// Stable for a given record identity; repeated reconciliation (or a second
/// concurrent one) always arrives at the same name.
pub fn job_name(request: &Request) -> String {
    format!("{}-{}", request.spec.requested_job, request.id.simple())
}

/// Correlates records with engine jobs through bounded engine calls
pub struct Correlator {
    engine: Arc<dyn JobEngine>,
    call_timeout: Duration,
}

impl Correlator {
    pub fn new(engine: Arc<dyn JobEngine>, call_timeout: Duration) -> Self {
        Self {
            engine,
            call_timeout,
        }
    }

    /// Looks up the job previously created for this record, if any.
    pub async fn find_existing(&self, request: &Request) -> Result<Option<JobHandle>, EngineError> {
        let name = job_name(request);
        self.bounded(self.engine.find_job(&name)).await
    }

    /// Finds or creates the record's job
    ///
    /// An `AlreadyExists` answer from the engine means another invocation won
    /// the create race; the winner's job is adopted as our own.
    pub async fn ensure_created(
        &self,
        request: &Request,
        template: &JobTemplate,
    ) -> Result<JobHandle, EngineError> {
        let name = job_name(request);

        if let Some(handle) = self.bounded(self.engine.find_job(&name)).await? {
            tracing::debug!("Job {} already exists for request {}", name, request.id);
            return Ok(handle);
        }

        let spec = JobSpec {
            name: name.clone(),
            template: template.name.clone(),
            parameters: request.spec.parameters.clone(),
            request_id: request.id,
        };

        match self.bounded(self.engine.create_job(spec)).await {
            Ok(handle) => {
                tracing::info!("Created job {} for request {}", name, request.id);
                Ok(handle)
            }
            Err(e) if e.is_already_exists() => {
                tracing::debug!("Lost create race for job {}, adopting existing", name);
                Ok(JobHandle { name })
            }
            Err(e) => Err(e),
        }
    }

    /// Reports the job's current observed state.
    pub async fn observe(&self, handle: &JobHandle) -> Result<JobOutcome, EngineError> {
        self.bounded(self.engine.observe_job(handle)).await
    }

    /// Deletes the job. A job that is already gone counts as deleted.
    pub async fn delete(&self, handle: &JobHandle) -> Result<(), EngineError> {
        match self.bounded(self.engine.delete_job(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        timeout(self.call_timeout, call)
            .await
            .map_err(|_| EngineError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dispatch_core::domain::request::RequestSpec;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeEngine {
        jobs: Mutex<HashMap<String, JobOutcome>>,
        creates: AtomicUsize,
        /// Simulates a concurrent winner: find reports absent, create
        /// collides.
        lose_create_race: bool,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                jobs: Mutex::new(HashMap::new()),
                creates: AtomicUsize::new(0),
                lose_create_race: false,
            }
        }
    }

    #[async_trait]
    impl JobEngine for FakeEngine {
        async fn find_job(&self, name: &str) -> Result<Option<JobHandle>, EngineError> {
            if self.lose_create_race {
                return Ok(None);
            }
            Ok(self.jobs.lock().unwrap().get(name).map(|_| JobHandle {
                name: name.to_string(),
            }))
        }

        async fn create_job(&self, spec: JobSpec) -> Result<JobHandle, EngineError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&spec.name) {
                return Err(EngineError::AlreadyExists(spec.name));
            }
            jobs.insert(spec.name.clone(), JobOutcome::Pending);
            Ok(JobHandle { name: spec.name })
        }

        async fn observe_job(&self, handle: &JobHandle) -> Result<JobOutcome, EngineError> {
            self.jobs
                .lock()
                .unwrap()
                .get(&handle.name)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(handle.name.clone()))
        }

        async fn delete_job(&self, handle: &JobHandle) -> Result<(), EngineError> {
            self.jobs
                .lock()
                .unwrap()
                .remove(&handle.name)
                .map(|_| ())
                .ok_or_else(|| EngineError::NotFound(handle.name.clone()))
        }
    }

    fn request() -> Request {
        Request::new(
            "tenant-a",
            RequestSpec {
                requested_job: "deploy-x".to_string(),
                parameters: HashMap::new(),
            },
        )
    }

    fn template() -> JobTemplate {
        JobTemplate {
            name: "deploy-x".to_string(),
            description: None,
            payload: "{}".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_job_name_is_deterministic() {
        let r = request();
        assert_eq!(job_name(&r), job_name(&r));
        assert!(job_name(&r).starts_with("deploy-x-"));

        // Distinct records never share a name.
        assert_ne!(job_name(&r), job_name(&request()));
    }

    #[tokio::test]
    async fn test_ensure_created_is_idempotent() {
        let engine = Arc::new(FakeEngine::new());
        let correlator = Correlator::new(engine.clone(), Duration::from_secs(1));
        let r = request();

        let first = correlator.ensure_created(&r, &template()).await.unwrap();
        let second = correlator.ensure_created(&r, &template()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.creates.load(Ordering::SeqCst), 1);
        assert_eq!(engine.jobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lost_create_race_is_success() {
        let mut fake = FakeEngine::new();
        fake.lose_create_race = true;
        let r = request();
        fake.jobs
            .lock()
            .unwrap()
            .insert(job_name(&r), JobOutcome::Pending);

        let engine = Arc::new(fake);
        let correlator = Correlator::new(engine.clone(), Duration::from_secs(1));

        let handle = correlator.ensure_created(&r, &template()).await.unwrap();
        assert_eq!(handle.name, job_name(&r));
        assert_eq!(engine.jobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_tolerates_absent_job() {
        let engine = Arc::new(FakeEngine::new());
        let correlator = Correlator::new(engine, Duration::from_secs(1));

        let handle = JobHandle {
            name: "deploy-x-gone".to_string(),
        };
        assert!(correlator.delete(&handle).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_existing_never_creates() {
        let engine = Arc::new(FakeEngine::new());
        let correlator = Correlator::new(engine.clone(), Duration::from_secs(1));

        let found = correlator.find_existing(&request()).await.unwrap();
        assert!(found.is_none());
        assert_eq!(engine.creates.load(Ordering::SeqCst), 0);
    }
}
