use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, ETAG};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{TransferContext, TransferStrategy};
use crate::config::BackoffPolicy;
use crate::constants::{MULTIPART_MAX_RETRIES, MULTIPART_PART_CONCURRENCY};
use crate::error::{ErrorCode, UploadError};
use crate::models::{
    CompletedPart, FailureReport, LocalFile, MultipartCompletion, TransferMode, UploadSlot,
};
use crate::utils::backoff::ExponentialBackoff;
use crate::utils::http;

/// Chunked upload: one presigned PUT per part, then `multipart-complete`.
pub struct MultipartTransfer {
    retry_backoff: BackoffPolicy,
    max_retries: u32,
}

impl Default for MultipartTransfer {
    fn default() -> Self {
        Self {
            retry_backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(100),
                factor: 2,
                max_delay: Duration::from_secs(5),
            },
            max_retries: MULTIPART_MAX_RETRIES,
        }
    }
}

struct Part {
    url: String,
    number: u32,
    chunk: Bytes,
}

impl MultipartTransfer {
    pub fn new(retry_backoff: BackoffPolicy, max_retries: u32) -> Self {
        Self {
            retry_backoff,
            max_retries: max_retries.max(1),
        }
    }

    async fn upload_part(
        &self,
        ctx: &TransferContext,
        file: &LocalFile,
        slot: &UploadSlot,
        part: Part,
        loaded: &AtomicU64,
    ) -> Result<CompletedPart, UploadError> {
        let mut delays = ExponentialBackoff::new(self.retry_backoff);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.put_part(ctx, file, slot, &part).await {
                Ok(tag) => {
                    let len = part.chunk.len() as u64;
                    let now = loaded.fetch_add(len, Ordering::SeqCst) + len;
                    ctx.emit_progress(&file.name, now, file.size);
                    return Ok(CompletedPart {
                        tag,
                        part_number: part.number,
                    });
                }
                Err(e) if attempt < self.max_retries => {
                    let delay = delays.next().unwrap_or(self.retry_backoff.max_delay);
                    tracing::warn!(
                        "Part {} of {} failed (attempt {}/{}), retrying in {:?}: {}",
                        part.number,
                        file.name,
                        attempt,
                        self.max_retries,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn put_part(
        &self,
        ctx: &TransferContext,
        file: &LocalFile,
        slot: &UploadSlot,
        part: &Part,
    ) -> Result<String, UploadError> {
        let disposition = slot
            .content_disposition
            .clone()
            .unwrap_or_else(|| format!("inline; filename=\"{}\"", file.name.replace('"', "")));

        let request = ctx
            .client
            .put(part.url.as_str())
            .header(CONTENT_TYPE, file.mime_type.as_str())
            .header(CONTENT_DISPOSITION, disposition)
            .body(part.chunk.clone());
        let response = http::send(request, &part.url).await?;

        response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|tag| tag.replace('"', ""))
            .ok_or_else(|| {
                UploadError::domain(
                    ErrorCode::UploadFailed,
                    format!("Missing ETag for part {} of {}", part.number, file.name),
                )
            })
    }

    async fn upload_parts(
        &self,
        ctx: &TransferContext,
        file: &LocalFile,
        slot: &UploadSlot,
        urls: &[String],
        chunk_size: u64,
    ) -> Result<Vec<CompletedPart>, UploadError> {
        let loaded = AtomicU64::new(0);
        let loaded = &loaded;

        let parts: Vec<Part> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let start = (index as u64 * chunk_size).min(file.size);
                let end = (start + chunk_size).min(file.size);
                Part {
                    url: url.clone(),
                    number: index as u32 + 1,
                    chunk: file.content.slice(start as usize..end as usize),
                }
            })
            .collect();

        let mut etags: Vec<CompletedPart> = futures::stream::iter(parts)
            .map(|part| self.upload_part(ctx, file, slot, part, loaded))
            .buffered(MULTIPART_PART_CONCURRENCY)
            .try_collect()
            .await?;
        etags.sort_by_key(|p| p.part_number);
        Ok(etags)
    }
}

#[async_trait]
impl TransferStrategy for MultipartTransfer {
    async fn transfer(
        &self,
        file: &LocalFile,
        slot: &UploadSlot,
        ctx: &TransferContext,
    ) -> Result<(), UploadError> {
        let TransferMode::Multipart {
            urls,
            upload_id,
            chunk_size,
            ..
        } = &slot.transfer
        else {
            return Err(UploadError::ContractViolation(format!(
                "slot {} has no multi-part upload URLs",
                slot.key
            )));
        };
        if *chunk_size == 0 {
            return Err(UploadError::ContractViolation(format!(
                "slot {} has a zero chunk size",
                slot.key
            )));
        }

        tracing::debug!(
            "📤 Uploading {} in {} parts of {} bytes",
            file.name,
            urls.len(),
            chunk_size
        );

        let etags = match self.upload_parts(ctx, file, slot, urls, *chunk_size).await {
            Ok(etags) => etags,
            Err(e) => {
                tracing::error!("Multi-part upload of {} failed: {}", file.name, e);
                let report = FailureReport {
                    storage_error: Some(e.to_string()),
                    ..FailureReport::for_slot(slot)
                };
                ctx.report_failure(&report).await;
                return Err(e);
            }
        };

        ctx.reporter
            .complete_multipart(&MultipartCompletion {
                file_key: slot.key.clone(),
                upload_id: upload_id.clone(),
                etags,
            })
            .await
    }
}
