//! Job orchestration around [`clone_page`](crate::pipeline::clone_page)
//!
//! [`JobStore`] is an explicit job-id -> status map owned by whoever runs
//! jobs; nothing in the core reads it. [`JobRunner`] executes jobs on tokio's
//! blocking pool, each with its own renderer session so that navigation and
//! viewport state never leak between jobs. Cancellation is cooperative and
//! only takes effect between iterations.

use crate::artifacts::ArtifactStore;
use crate::pipeline::{clone_page_with, CloneReport, Control};
use crate::render::RenderSession;
use crate::{CloneConfig, Error, Result};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type JobId = Uuid;

/// Lifecycle of one job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running { iteration: u32 },
    Completed(CloneReport),
    Failed(String),
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_) | JobStatus::Cancelled)
    }
}

struct JobRecord {
    url: String,
    status: JobStatus,
    cancel: Arc<AtomicBool>,
}

/// Shared job-id -> status map. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<JobId, JobRecord>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, JobRecord>> {
        // A panicked writer leaves a map that is still structurally valid
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new queued job and return its id
    pub fn create(&self, url: &str) -> JobId {
        let id = Uuid::new_v4();
        self.lock().insert(
            id,
            JobRecord {
                url: url.to_string(),
                status: JobStatus::Queued,
                cancel: Arc::new(AtomicBool::new(false)),
            },
        );
        id
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.lock().get(&id).map(|r| r.status.clone())
    }

    pub fn url(&self, id: JobId) -> Option<String> {
        self.lock().get(&id).map(|r| r.url.clone())
    }

    /// Update a job's status. Finished jobs keep their final status.
    pub fn set_status(&self, id: JobId, status: JobStatus) {
        if let Some(record) = self.lock().get_mut(&id) {
            if !record.status.is_finished() {
                record.status = status;
            }
        }
    }

    /// Request cancellation. A queued job is cancelled on the spot; a running
    /// one stops before its next iteration. Returns false for unknown or
    /// already finished jobs.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut jobs = self.lock();
        let Some(record) = jobs.get_mut(&id) else {
            return false;
        };
        if record.status.is_finished() {
            return false;
        }
        record.cancel.store(true, Ordering::SeqCst);
        if record.status == JobStatus::Queued {
            record.status = JobStatus::Cancelled;
        }
        true
    }

    pub fn is_cancelled(&self, id: JobId) -> bool {
        self.lock()
            .get(&id)
            .map(|r| r.cancel.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// All job ids with their status, in no particular order
    pub fn list(&self) -> Vec<(JobId, JobStatus)> {
        self.lock().iter().map(|(id, r)| (*id, r.status.clone())).collect()
    }

    /// Drop finished jobs; returns how many were removed
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, r| !r.status.is_finished());
        before - jobs.len()
    }
}

/// Opens one isolated renderer session per job
pub trait SessionFactory: Send + Sync {
    fn session(&self) -> Result<Box<dyn RenderSession>>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> Result<Box<dyn RenderSession>> + Send + Sync,
{
    fn session(&self) -> Result<Box<dyn RenderSession>> {
        self()
    }
}

/// A submitted job: its id and a handle resolving to its final status
pub struct JobHandle {
    pub id: JobId,
    handle: JoinHandle<JobStatus>,
}

impl JobHandle {
    pub async fn wait(self) -> JobStatus {
        match self.handle.await {
            Ok(status) => status,
            Err(e) => JobStatus::Failed(format!("Job task aborted: {}", e)),
        }
    }
}

/// Wait for every handle; results keep submission order
pub async fn wait_all(handles: Vec<JobHandle>) -> Vec<(JobId, JobStatus)> {
    let ids: Vec<JobId> = handles.iter().map(|h| h.id).collect();
    let statuses = futures::future::join_all(handles.into_iter().map(JobHandle::wait)).await;
    ids.into_iter().zip(statuses).collect()
}

/// Runs clone jobs concurrently, bounded by a semaphore
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    factory: Arc<dyn SessionFactory>,
    config: Arc<CloneConfig>,
    slots: Arc<Semaphore>,
}

impl JobRunner {
    /// A runner allowing one job per CPU at a time
    pub fn new(factory: Arc<dyn SessionFactory>, config: CloneConfig) -> Self {
        Self::with_concurrency(factory, config, num_cpus::get())
    }

    pub fn with_concurrency(factory: Arc<dyn SessionFactory>, config: CloneConfig, max_jobs: usize) -> Self {
        Self {
            store: JobStore::new(),
            factory,
            config: Arc::new(config),
            slots: Arc::new(Semaphore::new(max_jobs.max(1))),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Queue a job for `url`. Must be called from within a tokio runtime.
    pub fn submit(&self, url: &str) -> JobHandle {
        let id = self.store.create(url);
        let url = url.to_string();
        let runner = self.clone();

        let handle = tokio::spawn(async move {
            let _permit = match runner.slots.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let status = JobStatus::Failed(format!("Runner shut down: {}", e));
                    runner.store.set_status(id, status.clone());
                    return status;
                }
            };

            let store = runner.store.clone();
            let worker = tokio::task::spawn_blocking(move || runner.run_job(id, &url));
            let status = match worker.await {
                Ok(status) => status,
                Err(e) => JobStatus::Failed(format!("Job worker panicked: {}", e)),
            };
            store.set_status(id, status.clone());
            store.status(id).unwrap_or(status)
        });

        JobHandle { id, handle }
    }

    fn run_job(&self, id: JobId, url: &str) -> JobStatus {
        if self.store.is_cancelled(id) {
            return JobStatus::Cancelled;
        }
        self.store.set_status(id, JobStatus::Running { iteration: 0 });
        info!("job {} started for {}", id, url);

        let artifacts = match &self.config.artifact_dir {
            Some(dir) => match ArtifactStore::new(dir.join(id.to_string())) {
                Ok(store) => store,
                Err(e) => return JobStatus::Failed(e.to_string()),
            },
            None => ArtifactStore::disabled(),
        };

        let mut session = match self.factory.session() {
            Ok(session) => session,
            Err(e) => {
                warn!("job {}: could not open a renderer session: {}", id, e);
                return JobStatus::Failed(e.to_string());
            }
        };

        let result = clone_page_with(&mut session, url, &self.config, &artifacts, |iteration| {
            if self.store.is_cancelled(id) {
                Control::Cancel
            } else {
                self.store.set_status(id, JobStatus::Running { iteration });
                Control::Continue
            }
        });
        // Release the renderer context before reporting
        drop(session);

        match result {
            Ok(report) => {
                info!("job {} completed", id);
                JobStatus::Completed(report)
            }
            Err(Error::Cancelled) => JobStatus::Cancelled,
            Err(e) => {
                warn!("job {} failed: {}", id, e);
                JobStatus::Failed(e.to_string())
            }
        }
    }
}
