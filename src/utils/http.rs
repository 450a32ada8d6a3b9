use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::constants::{DEFAULT_API_PATH, DEFAULT_ORIGIN};
use crate::error::{ErrorCode, UploadError};

/// Sends a request, mapping transport failures and error statuses.
///
/// Any status >= 400 becomes a domain error whose code is derived from the
/// status; the response body is kept as the cause.
pub async fn send(request: RequestBuilder, url: &str) -> Result<Response, UploadError> {
    let response = request
        .send()
        .await
        .map_err(|e| UploadError::fetch(url, e))?;
    ensure_success(response).await
}

pub async fn ensure_success(response: Response) -> Result<Response, UploadError> {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| format!("Request to {} failed with status {}", url, status));

    tracing::debug!("{} responded {}: {}", url, status, body);
    Err(UploadError::domain_with_cause(
        ErrorCode::from_status(status.as_u16()),
        message,
        body,
    ))
}

/// Reads the body as JSON; malformed bodies surface as `InvalidJson`.
pub async fn parse_response_json(response: Response) -> Result<Value, UploadError> {
    let url = response.url().to_string();
    let text = response
        .text()
        .await
        .map_err(|e| UploadError::fetch(url, e))?;
    Ok(serde_json::from_str(&text)?)
}

fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|field| json.get(field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Resolves an optional, possibly relative coordinator URL.
///
/// Missing or relative URLs are joined onto the default origin, and a bare
/// origin gets the default API path.
pub fn resolve_maybe_url_arg(maybe_url: Option<&str>) -> Result<Url, UploadError> {
    let base = Url::parse(DEFAULT_ORIGIN).map_err(|e| UploadError::InvalidUrl(e.to_string()))?;
    let raw = maybe_url.unwrap_or(DEFAULT_API_PATH);

    let mut url = base
        .join(raw)
        .map_err(|_| UploadError::InvalidUrl(format!("Failed to parse '{}' as a URL.", raw)))?;
    if url.path() == "/" {
        url.set_path(DEFAULT_API_PATH);
    }
    Ok(url)
}
