use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::constants::MAX_CONCURRENT_UPLOADS;
use crate::error::{ErrorCode, UploadError};
use crate::models::{FailureReport, LocalFile, SlotRequest, UploadResult, UploadSlot};
use crate::services::reporter::EventReporter;
use crate::services::upload_task::{UploadContext, upload_file};

/// Requests slots for the whole batch and uploads every file under the
/// admission gate.
///
/// The first task error cancels `batch_token`, which interrupts the tasks
/// still running; they report their failure before the first error is
/// returned. Results come back in the order of `ctx.files`.
pub async fn upload_batch(
    reporter: Arc<dyn EventReporter>,
    ctx: UploadContext,
    input: Option<Value>,
    batch_token: CancellationToken,
) -> Result<Vec<UploadResult>, UploadError> {
    if batch_token.is_cancelled() {
        return Err(UploadError::Aborted);
    }

    let request = SlotRequest {
        input: input.unwrap_or(Value::Null),
        files: ctx.files.iter().map(LocalFile::descriptor).collect(),
    };
    let slots = tokio::select! {
        biased;
        _ = batch_token.cancelled() => return Err(UploadError::Aborted),
        slots = reporter.request_slots(&request) => slots?,
    };
    tracing::info!(
        "📦 Received {} upload slots for {} files",
        slots.len(),
        ctx.files.len()
    );

    let ctx = Arc::new(ctx);
    let gate = Arc::new(Semaphore::new(MAX_CONCURRENT_UPLOADS));
    let mut join_set = JoinSet::new();
    let slot_count = slots.len();

    for (index, slot) in slots.into_iter().enumerate() {
        let ctx = ctx.clone();
        let gate = gate.clone();
        let token = batch_token.child_token();

        join_set.spawn(async move {
            let outcome = run_task(&ctx, &gate, &slot, &token).await;
            (index, outcome)
        });
    }

    let mut results: Vec<Option<UploadResult>> = vec![None; slot_count];
    let mut failure: Option<UploadError> = None;

    while let Some(joined) = join_set.join_next().await {
        let outcome = match joined {
            Ok((index, Ok(result))) => {
                results[index] = Some(result);
                continue;
            }
            Ok((_, Err(e))) => e,
            Err(join_err) => UploadError::domain(
                ErrorCode::InternalClientError,
                format!("upload task panicked: {}", join_err),
            ),
        };

        // Interruptions only matter when nothing else went wrong.
        let replace = match &failure {
            None => true,
            Some(current) => current.is_aborted() && !outcome.is_aborted(),
        };
        if replace {
            if !outcome.is_aborted() {
                tracing::warn!("Upload failed, cancelling the rest of the batch: {}", outcome);
                batch_token.cancel();
            }
            failure = Some(outcome);
        }
    }

    if let Some(err) = failure {
        return Err(err);
    }

    let mut ordered: Vec<UploadResult> = results.into_iter().flatten().collect();
    ordered.sort_by_key(|result| {
        ctx.files
            .iter()
            .position(|f| f.name == result.name)
            .unwrap_or(usize::MAX)
    });
    Ok(ordered)
}

/// Runs one task once admitted. An interruption while it runs sends a
/// best-effort `failure` event, unless the transfer already sent one, before
/// surfacing as `Aborted`.
async fn run_task(
    ctx: &UploadContext,
    gate: &Semaphore,
    slot: &UploadSlot,
    token: &CancellationToken,
) -> Result<UploadResult, UploadError> {
    let _permit = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(UploadError::Aborted),
        permit = gate.acquire() => permit.map_err(|_| {
            UploadError::domain(ErrorCode::InternalClientError, "upload admission gate closed")
        })?,
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::warn!("🛑 Upload of {} interrupted, reporting failure", slot.file_name);
            ctx.transfer.report_failure(&FailureReport::for_slot(slot)).await;
            Err(UploadError::Aborted)
        }
        result = upload_file(ctx, slot) => result,
    }
}
