//! The storage-client seam: one `put` operation against a configurable
//! S3-compatible endpoint, abstracted behind a trait so the engine can be
//! driven against test doubles.

use crate::config::RunConfig;
use crate::err::{self, Error};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use snafu::{ensure, Snafu};

/// Remote object store. The engine only ever issues `put`; `bucket` exists
/// so workers can log full request context without holding the config.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    fn bucket(&self) -> &str;
    async fn put(&self, key: &str, body: ByteStream) -> Result<(), StoreError>;
}

#[derive(Snafu, Debug)]
#[snafu(visibility = "pub")]
pub enum StoreError {
    #[snafu(display("Access denied for s3://{}/{}: {}", bucket, key, message))]
    AccessDenied {
        bucket: String,
        key: String,
        message: String,
    },
    #[snafu(display("S3 'put object' error on key '{}': {}", key, message))]
    PutObject { key: String, message: String },
}

/// `ObjectStore` over `aws-sdk-s3`, with path-style addressing forced so
/// S3-compatible stores (minio, ceph) work against a plain endpoint URL.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub async fn connect(config: &RunConfig) -> Result<Self, Error> {
        if let Some(url) = &config.endpoint {
            ensure!(
                url.starts_with("http://") || url.starts_with("https://"),
                err::InvalidEndpoint { url: url.clone() }
            );
        }
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "run-config",
        );
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(url) = &config.endpoint {
            loader = loader.endpoint_url(url);
        }
        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, body: ByteStream) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map(drop)
            .map_err(|e| classify_put_error(&self.bucket, key, e))
    }
}

/// The AccessDenied service code gets its own variant carrying bucket, key
/// and message, so 403s can be diagnosed from the logs alone.
fn classify_put_error(bucket: &str, key: &str, error: SdkError<PutObjectError>) -> StoreError {
    let message = DisplayErrorContext(&error).to_string();
    if error.code() == Some("AccessDenied") {
        StoreError::AccessDenied {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            message,
        }
    } else {
        StoreError::PutObject {
            key: key.to_owned(),
            message,
        }
    }
}
