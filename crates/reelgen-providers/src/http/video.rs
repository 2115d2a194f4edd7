//! Generic submit/poll clip synthesis adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::ProviderCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, error_for_status, DEFAULT_CALL_TIMEOUT};
use crate::throttle::ProviderThrottle;
use crate::traits::{PollOutcome, RemoteStatus, VideoSubmission, VideoSynthesis};

const DEFAULT_BASE_URL: &str = "http://localhost:8103/v1";

// USD per clip second.
const USD_PER_SECOND: f64 = 0.25;

// Outbound ceiling; the poll loop touches every in-flight shot per tick.
const REQUESTS_PER_SECOND: u32 = 5;

/// Clip synthesis over a `POST /videos` + `GET /videos/{id}` queue.
pub struct HttpVideoSynthesis {
    http: Client,
    base_url: String,
    token: String,
    supports_end_frame: bool,
    throttle: ProviderThrottle,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    motion_prompt: &'a str,
    start_image_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_image_url: Option<&'a str>,
    duration_seconds: f64,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpVideoSynthesis {
    pub fn new(credentials: &ProviderCredentials, supports_end_frame: bool) -> ProviderResult<Self> {
        Self::with_timeout(credentials, supports_end_frame, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(
        credentials: &ProviderCredentials,
        supports_end_frame: bool,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(timeout)?,
            base_url: credentials
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token: credentials.token.clone(),
            supports_end_frame,
            throttle: ProviderThrottle::per_second(REQUESTS_PER_SECOND),
        })
    }

    fn parse_status(raw: &str) -> ProviderResult<RemoteStatus> {
        match raw {
            "queued" => Ok(RemoteStatus::Queued),
            "running" | "processing" => Ok(RemoteStatus::Running),
            "done" | "completed" => Ok(RemoteStatus::Done),
            "failed" | "error" => Ok(RemoteStatus::Failed),
            other => Err(ProviderError::malformed(format!(
                "unknown video status: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl VideoSynthesis for HttpVideoSynthesis {
    fn supports_end_frame(&self) -> bool {
        self.supports_end_frame
    }

    async fn submit(&self, request: &VideoSubmission) -> ProviderResult<String> {
        self.throttle.acquire().await;

        let url = format!("{}/videos", self.base_url.trim_end_matches('/'));
        let aspect = request.aspect_ratio.as_str();
        let body = SubmitRequest {
            motion_prompt: &request.motion_prompt,
            start_image_url: &request.start_image_url,
            end_image_url: if self.supports_end_frame {
                request.end_image_url.as_deref()
            } else {
                None
            },
            duration_seconds: request.duration,
            aspect_ratio: aspect,
        };

        debug!(duration = request.duration, aspect, "submitting clip request");

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
            .map_err(|e| ProviderError::malformed(format!("video submit response: {}", e)))?;
        Ok(parsed.request_id)
    }

    async fn poll(&self, handle: &str) -> ProviderResult<PollOutcome> {
        self.throttle.acquire().await;

        let url = format!("{}/videos/{}", self.base_url.trim_end_matches('/'), handle);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let parsed: PollResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("video poll response: {}", e)))?;

        Ok(PollOutcome {
            status: Self::parse_status(&parsed.status)?,
            url: parsed.video_url,
            error: parsed.error,
        })
    }

    fn estimate_cost(&self, duration: f64) -> f64 {
        duration * USD_PER_SECOND
    }
}
