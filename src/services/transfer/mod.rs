use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::UploadError;
use crate::models::{
    FailureReport, LocalFile, TransferMode, UploadProgress, UploadProgressHook, UploadSlot,
};
use crate::services::reporter::EventReporter;

pub mod multipart;
pub mod presigned_post;

pub use multipart::MultipartTransfer;
pub use presigned_post::PresignedPostTransfer;

/// Everything a transfer strategy may use besides the file and its slot.
#[derive(Clone)]
pub struct TransferContext {
    /// Client for storage requests; carries no coordinator headers.
    pub client: Client,
    pub reporter: Arc<dyn EventReporter>,
    pub on_progress: Option<UploadProgressHook>,
    /// Keys a `failure` event was already sent for.
    reported: Arc<Mutex<HashSet<String>>>,
}

impl TransferContext {
    pub fn new(
        client: Client,
        reporter: Arc<dyn EventReporter>,
        on_progress: Option<UploadProgressHook>,
    ) -> Self {
        Self {
            client,
            reporter,
            on_progress,
            reported: Arc::default(),
        }
    }

    /// Sends a best-effort `failure` event, at most once per slot key.
    ///
    /// The key is claimed before the request goes out, so an interruption
    /// while the first report is in flight does not lead to a second one.
    pub async fn report_failure(&self, report: &FailureReport) {
        let first = self
            .reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(report.file_key.clone());
        if !first {
            tracing::debug!("Failure of {} already reported", report.file_key);
            return;
        }

        if let Err(e) = self.reporter.report_failure(report).await {
            tracing::warn!("Could not report failure of {}: {}", report.file_name, e);
        }
    }

    pub fn emit_progress(&self, file: &str, loaded: u64, total: u64) {
        if let Some(hook) = &self.on_progress {
            hook(&UploadProgress::new(file, loaded, total));
        }
    }
}

/// Moves the bytes of one file into storage.
#[async_trait]
pub trait TransferStrategy: Send + Sync {
    async fn transfer(
        &self,
        file: &LocalFile,
        slot: &UploadSlot,
        ctx: &TransferContext,
    ) -> Result<(), UploadError>;
}

/// The two strategies a slot can ask for.
#[derive(Clone)]
pub struct TransferStrategies {
    pub presigned_post: Arc<dyn TransferStrategy>,
    pub multipart: Arc<dyn TransferStrategy>,
}

impl Default for TransferStrategies {
    fn default() -> Self {
        Self {
            presigned_post: Arc::new(PresignedPostTransfer),
            multipart: Arc::new(MultipartTransfer::default()),
        }
    }
}

impl TransferStrategies {
    /// Multi-part slots go chunk by chunk, everything else is one POST.
    pub fn for_slot(&self, slot: &UploadSlot) -> &Arc<dyn TransferStrategy> {
        match slot.transfer {
            TransferMode::Multipart { .. } => &self.multipart,
            TransferMode::PresignedPost { .. } => &self.presigned_post,
        }
    }
}
