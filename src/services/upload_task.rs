use crate::constants::PUBLIC_FILE_BASE_URL;
use crate::error::{ErrorCode, UploadError};
use crate::models::{LocalFile, UploadBegin, UploadBeginHook, UploadResult, UploadSlot};
use crate::services::poller::CompletionPoller;
use crate::services::transfer::{TransferContext, TransferStrategies};

/// State shared by every per-file task of one batch.
pub struct UploadContext {
    pub files: Vec<LocalFile>,
    pub skip_polling: bool,
    pub on_upload_begin: Option<UploadBeginHook>,
    pub transfers: TransferStrategies,
    pub transfer: TransferContext,
    pub poller: CompletionPoller,
}

/// Public URL of a stored object.
pub fn public_file_url(key: &str) -> String {
    format!("{}{}", PUBLIC_FILE_BASE_URL, key)
}

/// Uploads the file a slot was issued for and waits for its processing.
pub async fn upload_file(ctx: &UploadContext, slot: &UploadSlot) -> Result<UploadResult, UploadError> {
    let file = find_file(&ctx.files, slot)?;

    if let Some(hook) = &ctx.on_upload_begin {
        hook(&UploadBegin {
            file: file.name.clone(),
        });
    }

    let strategy = ctx.transfers.for_slot(slot);
    let ((), server_data) = tokio::try_join!(
        strategy.transfer(file, slot, &ctx.transfer),
        ctx.poller.server_data(slot, ctx.skip_polling),
    )?;

    tracing::info!("✅ Uploaded {} as {}", file.name, slot.key);
    Ok(UploadResult {
        name: file.name.clone(),
        size: file.size,
        key: slot.key.clone(),
        server_data,
        url: public_file_url(&slot.key),
        custom_id: slot.custom_id.clone(),
        file_type: file.mime_type.clone(),
    })
}

/// First file carrying the slot's name. Duplicate names are not told apart.
fn find_file<'a>(files: &'a [LocalFile], slot: &UploadSlot) -> Result<&'a LocalFile, UploadError> {
    files.iter().find(|f| f.name == slot.file_name).ok_or_else(|| {
        tracing::error!("No file found for presigned URL {:?}", slot);
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        UploadError::domain_with_cause(
            ErrorCode::NotFound,
            "No file found for presigned URL",
            format!(
                "Expected file with name {} but got '{}'",
                slot.file_name,
                names.join(",")
            ),
        )
    })
}
