use crate::store::StoreError;
use aws_sdk_s3::primitives::ByteStreamError;
use snafu::{Backtrace, Snafu};
use std::io;
use std::path::PathBuf;

/// Fatal errors: anything that aborts the run with a non-zero exit before
/// (or while) the engine drains its work.
#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum Error {
    #[snafu(display("Failed to create log file {}: {}", path.display(), source))]
    LogFile {
        source: io::Error,
        path: PathBuf,
        backtrace: Backtrace,
    },
    #[snafu(display("Failed to read source directory {}: {}", dir.display(), source))]
    ReadDir {
        source: walkdir::Error,
        dir: PathBuf,
        backtrace: Backtrace,
    },
    #[snafu(display("No files found in {}", dir.display()))]
    NoWork { dir: PathBuf },
    #[snafu(display("Concurrency must be at least 1"))]
    InvalidConcurrency,
    #[snafu(display("Invalid endpoint URL '{}': must start with http:// or https://", url))]
    InvalidEndpoint { url: String },
    #[snafu(display("Upload worker panicked: {}", source))]
    WorkerPanic { source: tokio::task::JoinError },
}

/// Per-task errors: captured as data in an [`Outcome`](crate::Outcome),
/// logged and counted, but never propagated past the worker that hit them.
#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum TaskError {
    #[snafu(display("Failed to open file {}: {}", path.display(), source))]
    FileOpen {
        source: ByteStreamError,
        path: PathBuf,
    },
    #[snafu(display("Failed to upload key '{}': {}", key, source))]
    Upload { source: StoreError, key: String },
}
