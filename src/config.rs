use crate::err::{self, Error};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::PathBuf;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of simultaneous upload requests. Also the capacity of
    /// the task queue feeding the workers, so submission blocks once this
    /// many tasks are buffered ahead of consumption.
    pub concurrency: usize,
    /// Directory whose files are uploaded. Only one directory level is
    /// globbed; nested trees are out of scope.
    pub source_dir: PathBuf,
    /// Destination bucket.
    pub bucket: String,
    /// Custom S3-compatible endpoint URL. `None` targets AWS itself.
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Exit non-zero when any file failed to upload. Off by default: a run
    /// that completes with per-file failures still exits 0.
    pub fail_on_error: bool,
}
impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 100,
            source_dir: PathBuf::from("load_test_files"),
            bucket: "my-bucket".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: String::new(),
            secret_key: String::new(),
            fail_on_error: false,
        }
    }
}

impl RunConfig {
    /// A zero concurrency would mean a queue nobody drains.
    pub fn validate(&self) -> Result<(), Error> {
        ensure!(self.concurrency >= 1, err::InvalidConcurrency);
        Ok(())
    }
}
