use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use rust_file_uploader::{CancellationToken, LocalFile, UploadFilesOptions, Uploader, UploaderConfig};
use std::path::PathBuf;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upload files through an upload coordinator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Coordinator URL; relative paths resolve against http://localhost:3000
    #[arg(long, env = "UPLOADER_URL")]
    url: Option<String>,

    /// Route registered on the coordinator
    #[arg(long)]
    endpoint: String,

    /// Package identifier sent to the coordinator
    #[arg(long, env = "UPLOADER_PACKAGE")]
    package: Option<String>,

    /// JSON input forwarded with the slot request
    #[arg(long)]
    input: Option<String>,

    /// Do not wait for the server-side callback
    #[arg(long)]
    skip_polling: bool,

    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_file_uploader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = UploaderConfig::from_env();
    if args.url.is_some() {
        config.url = args.url;
    }
    if let Some(package) = args.package {
        config.package = package;
    }
    info!(
        "⚙️  Polling backoff: {:?} x{} up to {:?}",
        config.poll_backoff.initial_delay, config.poll_backoff.factor, config.poll_backoff.max_delay
    );

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = LocalFile::from_path(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        files.push(file);
    }

    let signal = CancellationToken::new();
    let mut opts = UploadFilesOptions::new(files)
        .skip_polling(args.skip_polling)
        .with_signal(signal.clone())
        .on_upload_progress(|p| {
            tracing::debug!("📶 {} {:.0}% ({}/{})", p.file, p.progress, p.loaded, p.total)
        });
    if let Some(input) = &args.input {
        opts = opts.with_input(serde_json::from_str(input).context("--input is not valid JSON")?);
    }

    let uploader = Uploader::new(config)?;
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("⌨️  Ctrl+C received, aborting uploads...");
            signal.cancel();
        }
    });

    let results = uploader.upload_files(&args.endpoint, opts).await?;
    info!("✅ {} files uploaded", results.len());
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
