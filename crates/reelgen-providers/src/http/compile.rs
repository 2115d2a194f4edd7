//! Generic submit/poll clip compilation adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reelgen_models::AspectRatio;

use crate::credentials::ProviderCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, error_for_status, DEFAULT_CALL_TIMEOUT};
use crate::traits::{Compilation, CompileOptions, PollOutcome, RemoteStatus};

const DEFAULT_BASE_URL: &str = "http://localhost:8104/v1";

// USD per stitched clip.
const USD_PER_CLIP: f64 = 0.02;

/// Compilation over a `POST /compilations` + `GET /compilations/{id}` queue.
pub struct HttpCompilation {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    clip_urls: &'a [String],
    aspect_ratio: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fps: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    output_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpCompilation {
    pub fn new(credentials: &ProviderCredentials) -> ProviderResult<Self> {
        Self::with_timeout(credentials, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(
        credentials: &ProviderCredentials,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: credentials
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token: credentials.token.clone(),
        })
    }

    fn parse_status(raw: &str) -> ProviderResult<RemoteStatus> {
        match raw {
            "queued" => Ok(RemoteStatus::Queued),
            "running" | "processing" => Ok(RemoteStatus::Running),
            "done" | "completed" => Ok(RemoteStatus::Done),
            "failed" | "error" => Ok(RemoteStatus::Failed),
            other => Err(ProviderError::malformed(format!(
                "unknown compilation status: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl Compilation for HttpCompilation {
    async fn submit(
        &self,
        clip_urls: &[String],
        aspect_ratio: AspectRatio,
        options: &CompileOptions,
    ) -> ProviderResult<String> {
        let url = format!("{}/compilations", self.base_url.trim_end_matches('/'));
        let body = SubmitRequest {
            clip_urls,
            aspect_ratio: aspect_ratio.as_str(),
            fps: options.fps,
        };

        debug!(clips = clip_urls.len(), "submitting compilation request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("compile submit response: {}", e)))?;
        Ok(parsed.request_id)
    }

    async fn poll(&self, handle: &str) -> ProviderResult<PollOutcome> {
        let url = format!(
            "{}/compilations/{}",
            self.base_url.trim_end_matches('/'),
            handle
        );
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let parsed: PollResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("compile poll response: {}", e)))?;

        Ok(PollOutcome {
            status: Self::parse_status(&parsed.status)?,
            url: parsed.output_url,
            error: parsed.error,
        })
    }

    fn estimate_cost(&self, clip_count: usize) -> f64 {
        clip_count as f64 * USD_PER_CLIP
    }
}
