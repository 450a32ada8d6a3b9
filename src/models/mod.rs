use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

mod file;
mod options;

pub use file::{FileDescriptor, LocalFile};
pub use options::{
    ExpandedRouteConfig, RouteOptions, UploadBegin, UploadBeginHook, UploadFilesOptions,
    UploadProgress, UploadProgressHook,
};

/// Upload grant issued by the coordinator for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    pub key: String,
    pub file_name: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub custom_id: Option<String>,
    pub polling_url: String,
    pub polling_jwt: String,
    #[serde(default)]
    pub content_disposition: Option<String>,
    #[serde(flatten)]
    pub transfer: TransferMode,
}

/// How the bytes of a slot are moved; told apart by the response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferMode {
    #[serde(rename_all = "camelCase")]
    Multipart {
        urls: Vec<String>,
        upload_id: String,
        chunk_size: u64,
        #[serde(default)]
        chunk_count: u64,
    },
    PresignedPost {
        url: String,
        #[serde(default)]
        fields: BTreeMap<String, String>,
    },
}

impl UploadSlot {
    pub fn is_multipart(&self) -> bool {
        matches!(self.transfer, TransferMode::Multipart { .. })
    }

    pub fn upload_id(&self) -> Option<&str> {
        match &self.transfer {
            TransferMode::Multipart { upload_id, .. } => Some(upload_id),
            TransferMode::PresignedPost { .. } => None,
        }
    }
}

/// Body of the completion polling endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum PollingResponse {
    #[serde(rename = "still waiting")]
    StillWaiting,
    #[serde(rename = "done", rename_all = "camelCase")]
    Done { callback_data: Value },
}

/// Outcome of one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub name: String,
    pub size: u64,
    pub key: String,
    /// `None` when polling was skipped.
    pub server_data: Option<Value>,
    pub url: String,
    pub custom_id: Option<String>,
    #[serde(rename = "type")]
    pub file_type: String,
}

impl UploadResult {
    /// Reads the opaque server data as `T`.
    pub fn server_data_as<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        self.server_data
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }
}

/// Payload of the `upload` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRequest {
    pub input: Value,
    pub files: Vec<FileDescriptor>,
}

/// Payload of the `failure` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub file_key: String,
    pub upload_id: Option<String>,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
}

impl FailureReport {
    pub fn for_slot(slot: &UploadSlot) -> Self {
        Self {
            file_key: slot.key.clone(),
            upload_id: slot.upload_id().map(str::to_string),
            file_name: slot.file_name.clone(),
            storage_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    pub tag: String,
    pub part_number: u32,
}

/// Payload of the `multipart-complete` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartCompletion {
    pub file_key: String,
    pub upload_id: String,
    pub etags: Vec<CompletedPart>,
}
