use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::LocalFile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBegin {
    pub file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub file: String,
    /// Bytes sent so far.
    pub loaded: u64,
    pub total: u64,
    /// Percentage in `0.0..=100.0`.
    pub progress: f64,
}

impl UploadProgress {
    pub fn new(file: impl Into<String>, loaded: u64, total: u64) -> Self {
        let progress = if total == 0 {
            100.0
        } else {
            (loaded as f64 / total as f64 * 100.0).min(100.0)
        };
        Self {
            file: file.into(),
            loaded,
            total,
            progress,
        }
    }
}

pub type UploadBeginHook = Arc<dyn Fn(&UploadBegin) + Send + Sync>;
pub type UploadProgressHook = Arc<dyn Fn(&UploadProgress) + Send + Sync>;

/// Per-call options for [`crate::client::Uploader::upload_files`].
#[derive(Clone, Default)]
pub struct UploadFilesOptions {
    pub files: Vec<LocalFile>,
    /// Structured input forwarded to the coordinator with the slot request.
    pub input: Option<Value>,
    /// Return as soon as the bytes are stored, without waiting for the
    /// server-side callback.
    pub skip_polling: bool,
    pub on_upload_begin: Option<UploadBeginHook>,
    pub on_upload_progress: Option<UploadProgressHook>,
    /// Cancelling this token aborts the whole batch.
    pub signal: Option<CancellationToken>,
    /// Extra headers sent to the coordinator.
    pub headers: HeaderMap,
}

impl UploadFilesOptions {
    pub fn new(files: Vec<LocalFile>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn skip_polling(mut self, skip: bool) -> Self {
        self.skip_polling = skip;
        self
    }

    pub fn on_upload_begin(mut self, hook: impl Fn(&UploadBegin) + Send + Sync + 'static) -> Self {
        self.on_upload_begin = Some(Arc::new(hook));
        self
    }

    pub fn on_upload_progress(
        mut self,
        hook: impl Fn(&UploadProgress) + Send + Sync + 'static,
    ) -> Self {
        self.on_upload_progress = Some(Arc::new(hook));
        self
    }

    pub fn with_signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

impl fmt::Debug for UploadFilesOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFilesOptions")
            .field("files", &self.files.iter().map(|f| &f.name).collect::<Vec<_>>())
            .field("input", &self.input)
            .field("skip_polling", &self.skip_polling)
            .field("on_upload_begin", &self.on_upload_begin.is_some())
            .field("on_upload_progress", &self.on_upload_progress.is_some())
            .field("signal", &self.signal)
            .field("headers", &self.headers)
            .finish()
    }
}

/// Limits for one file-route type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOptions {
    /// Human readable size, e.g. `"4MB"`.
    pub max_file_size: String,
    pub max_file_count: u32,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            max_file_size: "4MB".to_string(),
            max_file_count: 1,
        }
    }
}

/// Route configuration keyed by file-route type (`image`, `pdf`, `blob`, or a
/// full MIME type).
pub type ExpandedRouteConfig = BTreeMap<String, RouteOptions>;
