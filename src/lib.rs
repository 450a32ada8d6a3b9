pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use client::Uploader;
pub use config::{BackoffPolicy, UploaderConfig};
pub use error::{ErrorCode, UploadError};
pub use models::{LocalFile, UploadFilesOptions, UploadResult};
pub use tokio_util::sync::CancellationToken;
