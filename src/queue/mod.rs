use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::fs;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};

use crate::errors::{EncodeResult, EncoderError};
use crate::utils::output_path_for;
use crate::video::{Encoder, ProcessRunner};

/// How long a finished job's status stays queryable
pub const STATUS_RETENTION: Duration = Duration::from_secs(60);

/// Unique job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status for tracking
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Waiting in queue
    Queued { position: usize },
    Processing,
    /// Produced an output file
    Completed,
    /// Nothing to do for this input
    Skipped,
    Failed(String),
}

struct Job {
    id: JobId,
    input: PathBuf,
    reply: oneshot::Sender<EncodeResult<Option<PathBuf>>>,
}

/// Handle returned by [`EncodeQueue::submit`]
pub struct JobHandle {
    pub id: JobId,
    receiver: oneshot::Receiver<EncodeResult<Option<PathBuf>>>,
}

impl JobHandle {
    /// Wait for the encode to finish
    pub async fn wait(self) -> EncodeResult<Option<PathBuf>> {
        self.receiver
            .await
            .map_err(|_| EncoderError::general(format!("job {} was dropped", self.id)))?
    }
}

type PathLocks = Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>;

/// Runs encodes in the background, off the submitting task.
///
/// At most `max_concurrent` encodes run at once and jobs that would write the
/// same output file never overlap.
pub struct EncodeQueue<R: ProcessRunner + 'static> {
    sender: mpsc::UnboundedSender<Job>,
    encoder: Arc<Encoder<R>>,
    semaphore: Arc<Semaphore>,
    statuses: Arc<Mutex<HashMap<JobId, JobStatus>>>,
    /// Jobs waiting for a permit
    pending_count: Arc<AtomicUsize>,
    /// Keyed by [`lock_key`]
    path_locks: PathLocks,
    status_retention: Duration,
}

impl<R: ProcessRunner + 'static> EncodeQueue<R> {
    /// Create the queue and start its worker
    pub fn new(encoder: Arc<Encoder<R>>, max_concurrent: usize) -> Arc<Self> {
        Self::with_retention(encoder, max_concurrent, STATUS_RETENTION)
    }

    /// Like [`EncodeQueue::new`], dropping finished statuses after `retention`
    pub fn with_retention(
        encoder: Arc<Encoder<R>>,
        max_concurrent: usize,
        retention: Duration,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();

        let queue = Arc::new(Self {
            sender,
            encoder,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            pending_count: Arc::new(AtomicUsize::new(0)),
            path_locks: Arc::new(Mutex::new(HashMap::new())),
            status_retention: retention,
        });

        let queue_clone = queue.clone();
        tokio::spawn(async move {
            queue_clone.run_worker(receiver).await;
        });

        queue
    }

    pub fn encoder(&self) -> &Arc<Encoder<R>> {
        &self.encoder
    }

    /// Queue `input` for encoding
    pub async fn submit(&self, input: impl Into<PathBuf>) -> EncodeResult<JobHandle> {
        let id = JobId::new();
        let (reply, receiver) = oneshot::channel();
        let position = self.pending_count.fetch_add(1, Ordering::SeqCst) + 1;

        self.statuses
            .lock()
            .await
            .insert(id.clone(), JobStatus::Queued { position });

        let job = Job {
            id: id.clone(),
            input: input.into(),
            reply,
        };

        if let Err(e) = self.sender.send(job) {
            self.pending_count.fetch_sub(1, Ordering::SeqCst);
            self.statuses.lock().await.remove(&id);
            return Err(EncoderError::general(format!("Failed to submit job: {}", e)));
        }

        log::info!("Queued job {} at position {}", id, position);
        Ok(JobHandle { id, receiver })
    }

    /// Number of jobs waiting to start
    pub fn pending_count(&self) -> usize {
        self.pending_count.load(Ordering::SeqCst)
    }

    pub async fn status(&self, id: &JobId) -> Option<JobStatus> {
        self.statuses.lock().await.get(id).cloned()
    }

    async fn run_worker(&self, mut receiver: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = receiver.recv().await {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                log::error!("Encode semaphore closed, stopping worker");
                break;
            };
            self.pending_count.fetch_sub(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .await
                .insert(job.id.clone(), JobStatus::Processing);

            let encoder = self.encoder.clone();
            let statuses = self.statuses.clone();
            let path_locks = self.path_locks.clone();
            let retention = self.status_retention;

            tokio::spawn(async move {
                let Job { id, input, reply } = job;
                log::info!("Processing job {}: {}", id, input.display());

                let key = lock_key(&input).await;
                let result = {
                    let path_lock = lock_for(&path_locks, &key).await;
                    let _guard = path_lock.lock().await;
                    encoder.encode(&input).await
                };
                release_lock(&path_locks, &key).await;

                let status = match &result {
                    Ok(Some(output)) => {
                        log::info!("Job {} produced {}", id, output.display());
                        JobStatus::Completed
                    }
                    Ok(None) => JobStatus::Skipped,
                    Err(e) => {
                        log::error!("Job {} failed: {}", id, e);
                        JobStatus::Failed(e.to_string())
                    }
                };
                statuses.lock().await.insert(id.clone(), status);

                if reply.send(result).is_err() {
                    log::debug!("Nobody is waiting for job {}", id);
                }

                drop(permit);

                tokio::time::sleep(retention).await;
                statuses.lock().await.remove(&id);
            });
        }
    }
}

/// The output file `input` encodes to, with its directory canonicalized.
///
/// `clip.avi` and `clip.mkv` share `clip.HEVC.mp4`, and `dir/./clip.avi`
/// names the same file as `dir/clip.avi`. Inputs without a valid output name
/// fall back to themselves; `encode` rejects them anyway.
async fn lock_key(input: &Path) -> PathBuf {
    let output = output_path_for(input).unwrap_or_else(|_| input.to_path_buf());
    let Some(name) = output.file_name() else {
        return output;
    };
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match fs::canonicalize(dir).await {
        Ok(dir) => dir.join(name),
        Err(_) => output,
    }
}

async fn lock_for(path_locks: &PathLocks, key: &Path) -> Arc<Mutex<()>> {
    path_locks
        .lock()
        .await
        .entry(key.to_path_buf())
        .or_default()
        .clone()
}

/// Forget the lock for `key` once no other job holds a reference to it
async fn release_lock(path_locks: &PathLocks, key: &Path) {
    let mut locks = path_locks.lock().await;
    if locks
        .get(key)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        locks.remove(key);
    }
}
