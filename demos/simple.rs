//! Programmatic use against a local minio on port 9000.

use s3_dirpush::{discover_files, upload_files, RunConfig, RunContext, S3Store};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let config = RunConfig {
        bucket: "test-bucket".to_string(),
        endpoint: Some("http://localhost:9000".to_string()),
        access_key: "minioadmin".to_string(),
        secret_key: "minioadmin".to_string(),
        ..RunConfig::default()
    };
    let ctx = RunContext::new(config);

    let files = discover_files(&ctx.config.source_dir).unwrap();
    let store = Arc::new(S3Store::connect(&ctx.config).await.unwrap());
    let report = upload_files(store, &ctx, files, CancellationToken::new())
        .await
        .unwrap();
    println!("{}", report.summary());
}
