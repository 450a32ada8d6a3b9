use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use crate::config::BackoffPolicy;
use crate::error::UploadError;
use crate::models::{PollingResponse, UploadSlot};
use crate::utils::backoff::ExponentialBackoff;
use crate::utils::http;

/// Waits for the server-side processing of an uploaded file to finish.
#[derive(Clone)]
pub struct CompletionPoller {
    client: Client,
    backoff: BackoffPolicy,
}

impl CompletionPoller {
    pub fn new(client: Client, backoff: BackoffPolicy) -> Self {
        Self { client, backoff }
    }

    /// Callback data of the slot, or `None` without a single request when
    /// `skip_polling` is set.
    pub async fn server_data(
        &self,
        slot: &UploadSlot,
        skip_polling: bool,
    ) -> Result<Option<Value>, UploadError> {
        if skip_polling {
            return Ok(None);
        }
        self.wait_for_completion(slot).await.map(Some)
    }

    /// Polls until the coordinator reports `done`.
    ///
    /// Only `still waiting` is retried. Error statuses, unreadable bodies and
    /// unknown response shapes end the loop on the first occurrence.
    pub async fn wait_for_completion(&self, slot: &UploadSlot) -> Result<Value, UploadError> {
        let mut delays = ExponentialBackoff::new(self.backoff);

        loop {
            match self.poll_once(&slot.polling_url, &slot.polling_jwt).await? {
                PollingResponse::Done { callback_data } => {
                    tracing::debug!(
                        "✅ {} processed after {} retries",
                        slot.file_name,
                        delays.attempt()
                    );
                    return Ok(callback_data);
                }
                PollingResponse::StillWaiting => {
                    let delay = delays.next().unwrap_or(self.backoff.max_delay);
                    tracing::debug!(
                        "⏳ {} still processing, polling again in {:?}",
                        slot.file_name,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub async fn poll_once(&self, url: &str, token: &str) -> Result<PollingResponse, UploadError> {
        let request = self.client.get(url).header(AUTHORIZATION, token);
        let response = http::send(request, url).await?;
        let json = http::parse_response_json(response).await?;

        serde_json::from_value(json).map_err(|e| {
            tracing::error!("Polling endpoint {} broke its response contract: {}", url, e);
            UploadError::ContractViolation(format!(
                "received a non PollingResponse from the polling endpoint: {}",
                e
            ))
        })
    }
}
