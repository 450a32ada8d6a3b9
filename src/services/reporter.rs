use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::error::UploadError;
use crate::models::{FailureReport, MultipartCompletion, SlotRequest, UploadSlot};
use crate::utils::http;

/// Channel to the coordinator that issues slots and receives lifecycle events.
#[async_trait]
pub trait EventReporter: Send + Sync {
    /// `upload`: asks for one slot per file of the batch.
    async fn request_slots(&self, request: &SlotRequest) -> Result<Vec<UploadSlot>, UploadError>;

    /// `failure`: tells the coordinator a file will not arrive.
    async fn report_failure(&self, report: &FailureReport) -> Result<(), UploadError>;

    /// `multipart-complete`: hands over the part etags of a finished multi-part upload.
    async fn complete_multipart(&self, completion: &MultipartCompletion)
    -> Result<(), UploadError>;
}

/// Reports events as `POST <url>?actionType=<event>&slug=<endpoint>` with a JSON body.
pub struct HttpEventReporter {
    client: Client,
    url: Url,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpEventReporter {
    pub fn new(client: Client, url: Url, endpoint: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            client,
            url,
            endpoint: endpoint.into(),
            headers,
        }
    }

    fn event_url(&self, action: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("actionType", action)
            .append_pair("slug", &self.endpoint);
        url
    }

    async fn send_event<P: Serialize + Sync>(
        &self,
        action: &str,
        payload: &P,
    ) -> Result<Response, UploadError> {
        let url = self.event_url(action);
        tracing::debug!("Reporting '{}' event to {}", action, url);

        let request = self
            .client
            .post(url.clone())
            .headers(self.headers.clone())
            .json(payload);
        http::send(request, url.as_str()).await
    }
}

#[async_trait]
impl EventReporter for HttpEventReporter {
    async fn request_slots(&self, request: &SlotRequest) -> Result<Vec<UploadSlot>, UploadError> {
        let response = self.send_event("upload", request).await?;
        let json = http::parse_response_json(response).await?;
        Ok(serde_json::from_value(json)?)
    }

    async fn report_failure(&self, report: &FailureReport) -> Result<(), UploadError> {
        self.send_event("failure", report).await?;
        Ok(())
    }

    async fn complete_multipart(
        &self,
        completion: &MultipartCompletion,
    ) -> Result<(), UploadError> {
        self.send_event("multipart-complete", completion).await?;
        Ok(())
    }
}
