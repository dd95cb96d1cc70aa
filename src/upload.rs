use crate::err::{self, Error, TaskError};
use crate::store::{ObjectStore, StoreError};
use crate::RunContext;
use aws_sdk_s3::primitives::ByteStream;
use futures::future::join_all;
use snafu::{ensure, ResultExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// One file's unit of work: where it comes from and where it lands.
/// Created once per discovered file, consumed exactly once by one worker.
#[derive(Clone, Debug)]
pub struct UploadTask {
    pub source_path: PathBuf,
    pub destination_key: String,
}

impl UploadTask {
    pub fn new(namespace: &str, source_path: PathBuf) -> Self {
        let destination_key = destination_key(namespace, &source_path);
        Self {
            source_path,
            destination_key,
        }
    }
}

/// Join the run namespace and the file's base name with a single separator.
///
/// Only the base name enters the key, so two files with equal base names at
/// different nesting levels map to the same key. That is accepted: discovery
/// globs a single directory level and nested trees are out of scope.
pub fn destination_key(namespace: &str, source_path: &Path) -> String {
    let base = source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", namespace, base)
}

/// List the regular files one level deep under `dir`, sorted so the
/// submission order is deterministic. An empty directory is an error: a run
/// with nothing to do aborts before any worker spawns or the store is
/// contacted.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| err::ReadDir {
            dir: dir.to_owned(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    ensure!(!files.is_empty(), err::NoWork { dir: dir.to_owned() });
    Ok(files)
}

/// The recorded result of processing one task.
#[derive(Debug)]
pub struct Outcome {
    pub task: UploadTask,
    pub error: Option<TaskError>,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate view of a finished run, produced by the completion tracker.
#[derive(Debug)]
pub struct RunReport {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// The failed outcomes, with their error kinds, in completion order.
    pub failures: Vec<Outcome>,
}

impl RunReport {
    fn new(discovered: usize) -> Self {
        Self {
            discovered,
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
        }
    }

    fn record(&mut self, outcome: Outcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push(outcome);
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files discovered: {} succeeded, {} failed",
            self.discovered, self.succeeded, self.failed
        )
    }

    /// Process exit code for this run. Per-file failures only count when the
    /// run opted into `fail_on_error`.
    pub fn exit_code(&self, fail_on_error: bool) -> i32 {
        if fail_on_error && self.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Upload `files` through `store` with at most `concurrency` puts in flight.
///
/// Exactly `concurrency` workers are spawned up front, all pulling from one
/// bounded queue of the same capacity; submission blocks when the queue is
/// full, which is what bounds memory use. Every submitted task yields
/// exactly one [`Outcome`]; the call returns once all workers have exited
/// and every outcome is aggregated.
///
/// Cancelling `cancel` stops the workers from dequeuing further tasks;
/// in-flight puts finish and still report their outcome.
pub async fn upload_files<S: ObjectStore>(
    store: Arc<S>,
    ctx: &RunContext,
    files: Vec<PathBuf>,
    cancel: CancellationToken,
) -> Result<RunReport, Error> {
    ctx.config.validate()?;
    ensure!(
        !files.is_empty(),
        err::NoWork {
            dir: ctx.config.source_dir.clone()
        }
    );

    let concurrency = ctx.config.concurrency;
    let discovered = files.len();
    info!("Found {} files to upload", discovered);

    let (task_tx, task_rx) = mpsc::channel::<UploadTask>(concurrency);
    let task_rx = Arc::new(Mutex::new(task_rx));
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<Outcome>();

    let workers: Vec<_> = (0..concurrency)
        .map(|_| {
            tokio::spawn(worker_loop(
                store.clone(),
                task_rx.clone(),
                outcome_tx.clone(),
                cancel.clone(),
            ))
        })
        .collect();
    // The tracker below must see the outcome channel close once the last
    // worker exits, so the engine's own sender cannot outlive dispatch.
    drop(outcome_tx);

    for path in files {
        let task = UploadTask::new(&ctx.namespace, path);
        if task_tx.send(task).await.is_err() {
            // Every worker is gone; only happens under cancellation.
            break;
        }
    }
    drop(task_tx);
    info!("All files queued for upload");

    let mut report = RunReport::new(discovered);
    while let Some(outcome) = outcome_rx.recv().await {
        report.record(outcome);
    }
    for worker in join_all(workers).await {
        worker.context(err::WorkerPanic)?;
    }
    Ok(report)
}

/// One worker: pull tasks until the queue is closed and drained (or the run
/// is cancelled), emitting exactly one outcome per task taken.
///
/// The receiver mutex and the outcome sender are the only shared state;
/// everything else a worker touches is owned per task.
async fn worker_loop<S: ObjectStore>(
    store: Arc<S>,
    queue: Arc<Mutex<mpsc::Receiver<UploadTask>>>,
    outcomes: mpsc::UnboundedSender<Outcome>,
    cancel: CancellationToken,
) {
    loop {
        let task = {
            let mut queue = queue.lock().await;
            tokio::select! {
                _ = cancel.cancelled() => None,
                task = queue.recv() => task,
            }
        };
        let task = match task {
            Some(task) => task,
            None => break,
        };
        let outcome = process_task(store.as_ref(), task).await;
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

/// Upload one file, reducing every failure to a recorded outcome.
async fn process_task<S: ObjectStore>(store: &S, task: UploadTask) -> Outcome {
    info!("Starting upload of {}", task.source_path.display());
    let error = match try_upload(store, &task).await {
        Ok(()) => {
            info!(
                "Successfully uploaded {} to {}/{}",
                task.source_path.display(),
                store.bucket(),
                task.destination_key
            );
            None
        }
        Err(error) => {
            if let TaskError::Upload {
                source:
                    StoreError::AccessDenied {
                        bucket,
                        key,
                        message,
                    },
                ..
            } = &error
            {
                error!(
                    bucket = %bucket,
                    key = %key,
                    message = %message,
                    "Access denied uploading {}",
                    task.source_path.display()
                );
            }
            warn!("Failed to upload {}: {}", task.source_path.display(), error);
            Some(error)
        }
    };
    Outcome { task, error }
}

async fn try_upload<S: ObjectStore>(store: &S, task: &UploadTask) -> Result<(), TaskError> {
    let body = ByteStream::from_path(&task.source_path)
        .await
        .with_context(|| err::FileOpen {
            path: task.source_path.clone(),
        })?;
    store
        .put(&task.destination_key, body)
        .await
        .with_context(|| err::Upload {
            key: task.destination_key.clone(),
        })?;
    Ok(())
}
