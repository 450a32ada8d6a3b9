use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Body;
use reqwest::multipart::{Form, Part};

use super::{TransferContext, TransferStrategy};
use crate::constants::PROGRESS_CHUNK_SIZE;
use crate::error::{ErrorCode, UploadError};
use crate::models::{FailureReport, LocalFile, TransferMode, UploadProgress, UploadSlot};

/// Single `multipart/form-data` POST to a presigned storage target.
pub struct PresignedPostTransfer;

#[async_trait]
impl TransferStrategy for PresignedPostTransfer {
    async fn transfer(
        &self,
        file: &LocalFile,
        slot: &UploadSlot,
        ctx: &TransferContext,
    ) -> Result<(), UploadError> {
        let TransferMode::PresignedPost { url, fields } = &slot.transfer else {
            return Err(UploadError::ContractViolation(format!(
                "slot {} has no presigned POST target",
                slot.key
            )));
        };

        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }

        // Malformed content types are sent as a generic binary part.
        let content_type = file
            .mime_type
            .parse::<mime::Mime>()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let part = Part::stream_with_length(progress_body(file, ctx), file.size)
            .file_name(file.name.clone())
            .mime_str(content_type.as_ref())
            .map_err(|e| UploadError::fetch(url.as_str(), e))?;
        form = form.part("file", part);

        tracing::debug!("📤 POST {} ({} bytes) to {}", file.name, file.size, url);
        let response = ctx
            .client
            .post(url.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::fetch(url.as_str(), e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let storage_error = response.text().await.unwrap_or_default();
        tracing::error!(
            "Storage rejected {} with status {}: {}",
            file.name,
            status,
            storage_error
        );

        let report = FailureReport {
            storage_error: Some(storage_error.clone()),
            ..FailureReport::for_slot(slot)
        };
        ctx.report_failure(&report).await;

        Err(UploadError::domain_with_cause(
            ErrorCode::UploadFailed,
            format!("Failed to upload file {} to storage ({})", file.name, status),
            storage_error,
        ))
    }
}

/// Streams the file in fixed-size pieces, reporting progress as each one is
/// handed to the connection.
fn progress_body(file: &LocalFile, ctx: &TransferContext) -> Body {
    let content = file.content.clone();
    let name = file.name.clone();
    let total = file.size;
    let hook = ctx.on_progress.clone();

    let pieces: Vec<Bytes> = (0..content.len())
        .step_by(PROGRESS_CHUNK_SIZE)
        .map(|start| content.slice(start..(start + PROGRESS_CHUNK_SIZE).min(content.len())))
        .collect();

    let mut loaded = 0u64;
    let stream = futures::stream::iter(pieces).map(move |piece| {
        loaded += piece.len() as u64;
        if let Some(hook) = &hook {
            hook(&UploadProgress::new(name.as_str(), loaded, total));
        }
        Ok::<Bytes, std::io::Error>(piece)
    });

    Body::wrap_stream(stream)
}
