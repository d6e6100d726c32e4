//! JSON `$batch` execution.

use reqwest::Method;
use tracing::debug;

use crate::client::Tm1Client;
use crate::client::rest::RequestOptions;
use crate::error::{ClientError, Result};
use crate::models::BatchRequest;
use crate::models::BatchResponse;
use crate::models::batch::{BatchEnvelope, BatchResponseEnvelope};

/// Subrequest URLs on TM1 11 are resolved against the server root, not the service root.
const V11_SUBREQUEST_PREFIX: &str = "/api/v1";

impl Tm1Client {
    /// Execute `requests` in one round trip.
    ///
    /// Responses come back in request order, each carrying its request id.
    pub async fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<BatchResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let v12 = self.rest.is_v12().await?;
        let prepared: Vec<BatchRequest> = requests
            .iter()
            .map(|r| {
                let mut r = r.clone();
                if !v12 && !r.url.starts_with(V11_SUBREQUEST_PREFIX) {
                    r.url = format!("{V11_SUBREQUEST_PREFIX}{}", r.url);
                }
                r
            })
            .collect();
        debug!(count = prepared.len(), "Sending batch");
        let body = serde_json::to_vec(&BatchEnvelope {
            requests: &prepared,
        })?;
        let opts = RequestOptions::new().header("Content-Type", "application/json");
        let envelope: BatchResponseEnvelope = self
            .rest
            .request(Method::POST, "/$batch", Some(body), &opts)
            .await?
            .json()?;

        let mut responses = envelope.responses;
        let mut ordered = Vec::with_capacity(requests.len());
        for request in requests {
            let idx = responses
                .iter()
                .position(|r| r.id == request.id)
                .ok_or_else(|| {
                    ClientError::ProtocolError(format!(
                        "batch response is missing request id {}",
                        request.id
                    ))
                })?;
            ordered.push(responses.swap_remove(idx));
        }
        Ok(ordered)
    }
}
