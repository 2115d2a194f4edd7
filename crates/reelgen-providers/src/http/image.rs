//! Generic synchronous frame synthesis adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::ProviderCredentials;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, error_for_status, DEFAULT_CALL_TIMEOUT};
use crate::traits::{ImageOutcome, ImageSynthesis};

const DEFAULT_BASE_URL: &str = "http://localhost:8102/v1";

// USD per generated frame at 1 megapixel; scales linearly with pixels.
const USD_PER_MEGAPIXEL: f64 = 0.04;

/// Frame synthesis over a synchronous `POST /images` endpoint.
pub struct HttpImageSynthesis {
    http: Client,
    base_url: String,
    token: String,
    quality: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
    seed: Option<u64>,
}

impl HttpImageSynthesis {
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
            quality: credentials.quality.clone(),
        })
    }
}

#[async_trait]
impl ImageSynthesis for HttpImageSynthesis {
    async fn synthesize(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: Option<u64>,
    ) -> ProviderResult<ImageOutcome> {
        let url = format!("{}/images", self.base_url.trim_end_matches('/'));
        let request = ImageRequest {
            prompt,
            width,
            height,
            seed,
            quality: self.quality.as_deref(),
        };

        debug!(width, height, "sending frame synthesis request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(format!("image response: {}", e)))?;

        Ok(ImageOutcome {
            url: parsed.url,
            width: parsed.width.unwrap_or(width),
            height: parsed.height.unwrap_or(height),
            seed: parsed.seed,
        })
    }

    fn estimate_cost(&self, width: u32, height: u32) -> f64 {
        (width as f64 * height as f64) / 1_000_000.0 * USD_PER_MEGAPIXEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(server: &MockServer) -> ProviderCredentials {
        ProviderCredentials::new("test-token").with_endpoint(format!("{}/v1", server.uri()))
    }

    #[tokio::test]
    async fn test_synthesize_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images"))
            .and(body_partial_json(serde_json::json!({
                "width": 1920,
                "height": 1080,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "url": "https://cdn.example/frame-1.png",
                "seed": 42,
            })))
            .mount(&server)
            .await;

        let adapter = HttpImageSynthesis::new(&creds(&server)).unwrap();
        let outcome = adapter
            .synthesize("a pine forest at dawn", 1920, 1080, None)
            .await
            .unwrap();

        assert_eq!(outcome.url, "https://cdn.example/frame-1.png");
        // Dimensions fall back to the requested ones when the provider omits them.
        assert_eq!((outcome.width, outcome.height), (1920, 1080));
        assert_eq!(outcome.seed, Some(42));
    }

    #[tokio::test]
    async fn test_bad_request_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images"))
            .respond_with(ResponseTemplate::new(400).set_body_string("prompt rejected"))
            .mount(&server)
            .await;

        let adapter = HttpImageSynthesis::new(&creds(&server)).unwrap();
        let err = adapter.synthesize("p", 1024, 1024, None).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_retryable());
    }
}
