use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::Arc;
use url::Url;

use crate::config::UploaderConfig;
use crate::constants::{HEADER_FE_PACKAGE, HEADER_VERSION, UPLOADER_VERSION};
use crate::error::{ErrorCode, UploadError};
use crate::models::{UploadFilesOptions, UploadResult};
use crate::services::orchestrator;
use crate::services::poller::CompletionPoller;
use crate::services::reporter::{EventReporter, HttpEventReporter};
use crate::services::transfer::{TransferContext, TransferStrategies};
use crate::services::upload_task::UploadContext;
use crate::utils::http::resolve_maybe_url_arg;

/// Uploads batches of files through a coordinator.
///
/// One `Uploader` can serve any number of batches; the HTTP clients are
/// shared between them.
#[derive(Clone)]
pub struct Uploader {
    config: UploaderConfig,
    url: Url,
    /// Talks to the coordinator and the polling endpoint.
    coordinator_client: Client,
    /// Talks to storage; presigned targets get no coordinator headers.
    storage_client: Client,
    transfers: TransferStrategies,
}

impl Uploader {
    pub fn new(config: UploaderConfig) -> Result<Self, UploadError> {
        let url = resolve_maybe_url_arg(config.url.as_deref())?;

        let mut headers = HeaderMap::new();
        headers.insert(HEADER_VERSION, HeaderValue::from_static(UPLOADER_VERSION));
        headers.insert(
            HEADER_FE_PACKAGE,
            HeaderValue::from_str(&config.package).map_err(|e| {
                UploadError::domain(
                    ErrorCode::InvalidServerConfig,
                    format!("Invalid package name {:?}: {}", config.package, e),
                )
            })?,
        );

        let mut coordinator = Client::builder().default_headers(headers);
        let mut storage = Client::builder();
        if let Some(timeout) = config.request_timeout {
            coordinator = coordinator.timeout(timeout);
            storage = storage.timeout(timeout);
        }
        let coordinator_client = coordinator
            .build()
            .map_err(|e| UploadError::fetch(url.as_str(), e))?;
        let storage_client = storage
            .build()
            .map_err(|e| UploadError::fetch(url.as_str(), e))?;

        tracing::info!("🔗 Uploader ready for {} (package {})", url, config.package);

        Ok(Self {
            config,
            url,
            coordinator_client,
            storage_client,
            transfers: TransferStrategies::default(),
        })
    }

    /// Replaces the storage transfer strategies.
    pub fn with_transfers(mut self, transfers: TransferStrategies) -> Self {
        self.transfers = transfers;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Uploads `opts.files` to the route registered as `endpoint`.
    ///
    /// Once `opts.signal` is cancelled the call fails with
    /// [`UploadError::Aborted`], whatever the individual tasks ran into.
    pub async fn upload_files(
        &self,
        endpoint: &str,
        opts: UploadFilesOptions,
    ) -> Result<Vec<UploadResult>, UploadError> {
        let signal = opts.signal.unwrap_or_default();
        let batch_token = signal.child_token();

        let reporter: Arc<dyn EventReporter> = Arc::new(HttpEventReporter::new(
            self.coordinator_client.clone(),
            self.url.clone(),
            endpoint,
            opts.headers,
        ));

        let ctx = UploadContext {
            files: opts.files,
            skip_polling: opts.skip_polling,
            on_upload_begin: opts.on_upload_begin,
            transfers: self.transfers.clone(),
            transfer: TransferContext::new(
                self.storage_client.clone(),
                reporter.clone(),
                opts.on_upload_progress,
            ),
            poller: CompletionPoller::new(
                self.coordinator_client.clone(),
                self.config.poll_backoff,
            ),
        };

        tracing::info!(
            "🚀 Uploading {} files to endpoint '{}'",
            ctx.files.len(),
            endpoint
        );
        let result = orchestrator::upload_batch(reporter, ctx, opts.input, batch_token).await;

        match result {
            Err(e) if signal.is_cancelled() => {
                tracing::info!("🛑 Upload to '{}' aborted: {}", endpoint, e);
                Err(UploadError::Aborted)
            }
            other => other,
        }
    }
}
