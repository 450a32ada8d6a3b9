use std::path::Path;
use thiserror::Error;

use crate::error::UploadError;
use crate::models::{ExpandedRouteConfig, LocalFile};

const FILESIZE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];

/// Extension to MIME type lookup for the file types routes usually accept
const MIME_BY_EXTENSION: &[(&str, &str)] = &[
    // Documents
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("json", "application/json"),
    ("xml", "application/xml"),
    ("rtf", "application/rtf"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    // Images
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("svg", "image/svg+xml"),
    ("ico", "image/vnd.microsoft.icon"),
    ("avif", "image/avif"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
    ("m4a", "audio/mp4"),
    // Video
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("ts", "video/mp2t"),
    // Archives
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/vnd.rar"),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

/// Looks up a MIME type from the file's extension
pub fn mime_from_file_name(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())?
        .to_lowercase();

    MIME_BY_EXTENSION
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, mime)| *mime)
}

/// Parses a human readable size such as `"4MB"` or `"1.5 GB"` into bytes
pub fn file_size_to_bytes(file_size: &str) -> Result<u64, ValidationError> {
    let invalid = || ValidationError {
        code: "INVALID_FILE_SIZE",
        message: format!("Invalid file size: {}", file_size),
    };

    let trimmed = file_size.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(invalid)?;
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim().to_uppercase();

    // Leading digits are required; a bare fraction like ".5MB" is rejected.
    if number.is_empty() || number.starts_with('.') || number.matches('.').count() > 1 {
        return Err(invalid());
    }

    let exponent = FILESIZE_UNITS
        .iter()
        .position(|u| *u == unit)
        .ok_or_else(invalid)?;
    let value: f64 = number.parse().map_err(|_| invalid())?;

    Ok((value * 1024f64.powi(exponent as i32)).floor() as u64)
}

/// Resolves which route type of `allowed_types` a file name falls under
pub fn type_from_file_name(
    file_name: &str,
    allowed_types: &[&str],
) -> Result<String, ValidationError> {
    let Some(mime_type) = mime_from_file_name(file_name) else {
        if allowed_types.contains(&"blob") {
            return Ok("blob".to_string());
        }
        return Err(ValidationError {
            code: "UNKNOWN_FILE_TYPE",
            message: format!(
                "Could not determine type for {}, presigned URLs can only be generated for files with valid extensions",
                file_name
            ),
        });
    };

    if allowed_types.iter().any(|t| t.contains('/')) && allowed_types.contains(&mime_type) {
        return Ok(mime_type.to_string());
    }

    let category = if mime_type.eq_ignore_ascii_case("application/pdf") {
        "pdf"
    } else {
        mime_type.split('/').next().unwrap_or(mime_type)
    };

    if !allowed_types.contains(&category) {
        if allowed_types.contains(&"blob") {
            return Ok("blob".to_string());
        }
        return Err(ValidationError {
            code: "INVALID_FILE_TYPE",
            message: format!(
                "File type {} not allowed for {} (allowed: {})",
                category,
                file_name,
                allowed_types.join(", ")
            ),
        });
    }

    Ok(category.to_string())
}

/// Resolves which of the route's configured types a file falls under
pub fn route_type_of(
    file: &LocalFile,
    route_config: &ExpandedRouteConfig,
) -> Result<String, UploadError> {
    let allowed: Vec<&str> = route_config.keys().map(String::as_str).collect();
    Ok(type_from_file_name(&file.name, &allowed)?)
}

/// Checks that the file's declared MIME type matches a type the route accepts
pub fn is_valid_file_type(file: &LocalFile, route_config: &ExpandedRouteConfig) -> bool {
    match route_type_of(file, route_config) {
        Ok(route_type) => file.mime_type.contains(route_type.as_str()),
        Err(_) => false,
    }
}

/// Checks that the file does not exceed the size limit of its route type
pub fn is_valid_file_size(file: &LocalFile, route_config: &ExpandedRouteConfig) -> bool {
    route_type_of(file, route_config)
        .ok()
        .and_then(|route_type| route_config.get(&route_type))
        .and_then(|options| file_size_to_bytes(&options.max_file_size).ok())
        .map(|max| file.size <= max)
        .unwrap_or(false)
}
