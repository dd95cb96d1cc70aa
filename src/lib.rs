//! # Bounded-concurrency directory upload to S3
//! Uploads every file in one directory level to an S3-compatible bucket
//! through a fixed pool of workers fed by a bounded queue.
//!
//! - Discover the files with [`discover_files`], then upload them with
//!   [`upload_files`].
//! - Implement [`ObjectStore`] to target a different store or to drive the
//!   engine in tests.
//!
//! Per-file failures are collected into a [`RunReport`] rather than aborting
//! the run; only setup failures (and an empty source directory) are fatal.

use chrono::Local;

mod config;
pub mod err;
mod store;
mod upload;

pub use config::RunConfig;
pub use err::{Error, TaskError};
pub use store::{ObjectStore, S3Store, StoreError};
pub use upload::*;

#[cfg(test)]
mod mock;

/// Per-invocation state handed into the engine: the immutable run
/// configuration plus the key namespace grouping this run's uploads.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub namespace: String,
    pub config: RunConfig,
}

impl RunContext {
    /// Fix the namespace once at startup so every key of this run shares one
    /// prefix and concurrent runs cannot collide.
    pub fn new(config: RunConfig) -> Self {
        Self {
            namespace: Local::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
            config,
        }
    }

    /// Pin the namespace explicitly instead of deriving it from the clock.
    pub fn with_namespace<N: Into<String>>(config: RunConfig, namespace: N) -> Self {
        Self {
            namespace: namespace.into(),
            config,
        }
    }
}
