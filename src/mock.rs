//! Test doubles for [`ObjectStore`], with just enough knobs to exercise the
//! engine: recording puts, failing selected keys, denying everything, and
//! simulating a slow remote while counting in-flight requests.

use crate::store::{ObjectStore, StoreError};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every successful put; fails keys listed in `fail_keys`, or
/// everything with an access-denied error when `deny_access` is set.
#[derive(Clone, Debug, Default)]
pub struct StoreStub {
    fail_keys: HashSet<String>,
    deny_access: bool,
    pub puts: Arc<Mutex<Vec<(String, Bytes)>>>,
}

impl StoreStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            fail_keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn denying_access() -> Self {
        Self {
            deny_access: true,
            ..Self::default()
        }
    }

    pub fn recorded_keys(&self) -> Vec<String> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for StoreStub {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn put(&self, key: &str, body: ByteStream) -> Result<(), StoreError> {
        // Drain the body like a real transport would.
        let data = body
            .collect()
            .await
            .map(|data| data.into_bytes())
            .unwrap_or_else(|_| Bytes::new());
        if self.deny_access {
            return Err(StoreError::AccessDenied {
                bucket: self.bucket().to_owned(),
                key: key.to_owned(),
                message: "403 Forbidden".to_owned(),
            });
        }
        if self.fail_keys.contains(key) {
            return Err(StoreError::PutObject {
                key: key.to_owned(),
                message: "simulated put failure".to_owned(),
            });
        }
        self.puts.lock().unwrap().push((key.to_owned(), data));
        Ok(())
    }
}

/// Sleeps on every put and tracks how many puts are in flight at once, so
/// tests can assert the concurrency bound actually holds.
#[derive(Clone, Debug)]
pub struct SlowStore {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ObjectStore for SlowStore {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn put(&self, _key: &str, _body: ByteStream) -> Result<(), StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
