//! Upload every file in a directory to an S3-compatible bucket, with a
//! bounded number of concurrent uploads and a per-run log file.

use chrono::Local;
use clap::Parser;
use s3_dirpush::{discover_files, err, upload_files, Error, RunConfig, RunContext, S3Store};
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "upload")]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of concurrent uploads
    #[arg(long, default_value_t = 100)]
    rate: usize,

    /// Directory containing files to upload
    #[arg(long, default_value = "load_test_files")]
    dir: PathBuf,

    /// Bucket name
    #[arg(long, default_value = "my-bucket")]
    bucket: String,

    /// S3 endpoint URL (any S3-compatible store)
    #[arg(long)]
    endpoint: Option<String>,

    /// Region
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Access key
    #[arg(long, default_value = "")]
    access_key: String,

    /// Secret key
    #[arg(long, default_value = "")]
    secret_key: String,

    /// Exit non-zero if any file failed to upload
    #[arg(long)]
    fail_on_error: bool,

    /// Log level for the run log file (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Create the per-run log file and point the subscriber at it. Everything
/// the engine and the store adapter emit ends up there.
fn init_logging(level: &str) -> Result<PathBuf, Error> {
    let path = PathBuf::from(format!(
        "upload_{}.log",
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| err::LogFile { path: path.clone() })?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();
    Ok(path)
}

async fn run(args: Args) -> Result<i32, Error> {
    let log_path = init_logging(&args.log_level)?;

    let config = RunConfig {
        concurrency: args.rate,
        source_dir: args.dir,
        bucket: args.bucket,
        endpoint: args.endpoint,
        region: args.region,
        access_key: args.access_key,
        secret_key: args.secret_key,
        fail_on_error: args.fail_on_error,
    };
    config.validate()?;

    let ctx = RunContext::new(config);
    info!("Starting upload process to folder: {}", ctx.namespace);
    info!(
        "Starting upload with rate: {}, directory: {}, bucket: {}, endpoint: {}",
        ctx.config.concurrency,
        ctx.config.source_dir.display(),
        ctx.config.bucket,
        ctx.config.endpoint.as_deref().unwrap_or("default"),
    );

    let files = discover_files(&ctx.config.source_dir)?;
    let store = Arc::new(S3Store::connect(&ctx.config).await?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight uploads");
            interrupt.cancel();
        }
    });

    let report = upload_files(store, &ctx, files, cancel.clone()).await?;
    info!("Upload complete");
    for failure in &report.failures {
        if let Some(error) = &failure.error {
            warn!("{}: {}", failure.task.source_path.display(), error);
        }
    }

    info!("{}", report.summary());
    println!("{}", report.summary());
    println!("run log written to {}", log_path.display());

    if cancel.is_cancelled() {
        return Ok(130);
    }
    Ok(report.exit_code(ctx.config.fail_on_error))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("upload failed: {}", error);
            std::process::exit(1);
        }
    }
}
