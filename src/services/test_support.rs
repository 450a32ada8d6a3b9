//! In-memory collaborators for service unit tests.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::BackoffPolicy;
use crate::error::{ErrorCode, UploadError};
use crate::models::{
    FailureReport, LocalFile, MultipartCompletion, SlotRequest, TransferMode, UploadSlot,
};
use crate::services::poller::CompletionPoller;
use crate::services::reporter::EventReporter;
use crate::services::transfer::{TransferContext, TransferStrategies, TransferStrategy};
use crate::services::upload_task::UploadContext;

/// Hands out preset slots and records every event it receives.
#[derive(Default)]
pub struct FakeReporter {
    pub slots: Vec<UploadSlot>,
    pub slot_requests: Mutex<Vec<SlotRequest>>,
    pub failures: Mutex<Vec<FailureReport>>,
    pub completions: Mutex<Vec<MultipartCompletion>>,
    pub fail_reports: bool,
    /// Time the coordinator takes to acknowledge a `failure` event.
    pub report_delay: Duration,
}

impl FakeReporter {
    pub fn with_slots(slots: Vec<UploadSlot>) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EventReporter for FakeReporter {
    async fn request_slots(&self, request: &SlotRequest) -> Result<Vec<UploadSlot>, UploadError> {
        self.slot_requests.lock().unwrap().push(request.clone());
        Ok(self.slots.clone())
    }

    async fn report_failure(&self, report: &FailureReport) -> Result<(), UploadError> {
        self.failures.lock().unwrap().push(report.clone());
        if !self.report_delay.is_zero() {
            tokio::time::sleep(self.report_delay).await;
        }
        if self.fail_reports {
            return Err(UploadError::domain(
                ErrorCode::InternalServerError,
                "coordinator unavailable",
            ));
        }
        Ok(())
    }

    async fn complete_multipart(&self, completion: &MultipartCompletion) -> Result<(), UploadError> {
        self.completions.lock().unwrap().push(completion.clone());
        Ok(())
    }
}

/// Sleeps per file and tracks how many transfers overlap.
#[derive(Default)]
pub struct SlowTransfer {
    pub delay: Duration,
    /// Files whose transfer never finishes.
    pub hang_on: Vec<String>,
    /// Files whose transfer fails right away.
    pub fail_on: Vec<String>,
    /// Failing transfers report the storage error themselves first.
    pub report_on_fail: bool,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub started: Mutex<Vec<String>>,
    pub finished: Mutex<Vec<String>>,
}

#[async_trait]
impl TransferStrategy for SlowTransfer {
    async fn transfer(
        &self,
        file: &LocalFile,
        slot: &UploadSlot,
        ctx: &TransferContext,
    ) -> Result<(), UploadError> {
        self.started.lock().unwrap().push(file.name.clone());
        if self.fail_on.contains(&file.name) {
            if self.report_on_fail {
                let report = FailureReport {
                    storage_error: Some("storage down".to_string()),
                    ..FailureReport::for_slot(slot)
                };
                ctx.report_failure(&report).await;
            }
            return Err(UploadError::domain(ErrorCode::UploadFailed, "storage down"));
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hang_on.contains(&file.name) {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.lock().unwrap().push(file.name.clone());
        Ok(())
    }
}

pub fn post_slot(key: &str, file_name: &str) -> UploadSlot {
    UploadSlot {
        key: key.to_string(),
        file_name: file_name.to_string(),
        file_type: None,
        custom_id: None,
        polling_url: "http://127.0.0.1:9/poll".to_string(),
        polling_jwt: "jwt".to_string(),
        content_disposition: None,
        transfer: TransferMode::PresignedPost {
            url: "http://127.0.0.1:9/storage".to_string(),
            fields: Default::default(),
        },
    }
}

pub fn multipart_slot(key: &str, file_name: &str) -> UploadSlot {
    UploadSlot {
        transfer: TransferMode::Multipart {
            urls: vec!["http://127.0.0.1:9/part/1".to_string()],
            upload_id: format!("upload-{}", key),
            chunk_size: 1024,
            chunk_count: 1,
        },
        ..post_slot(key, file_name)
    }
}

pub fn files(names: &[&str]) -> Vec<LocalFile> {
    names
        .iter()
        .map(|name| LocalFile::new(*name, "image/png", name.as_bytes().to_vec()))
        .collect()
}

/// Context that never polls and sends both slot shapes to `transfer`.
pub fn context(
    files: Vec<LocalFile>,
    reporter: Arc<dyn EventReporter>,
    transfer: Arc<dyn TransferStrategy>,
) -> UploadContext {
    UploadContext {
        files,
        skip_polling: true,
        on_upload_begin: None,
        transfers: TransferStrategies {
            presigned_post: transfer.clone(),
            multipart: transfer,
        },
        transfer: TransferContext::new(Client::new(), reporter, None),
        poller: CompletionPoller::new(Client::new(), BackoffPolicy::default()),
    }
}
