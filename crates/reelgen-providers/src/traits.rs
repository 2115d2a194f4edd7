//! Capability traits the pipeline consumes.
//!
//! Each external service family is one small trait, independent of the wire
//! format behind it. Adapters also expose a pure per-unit cost estimate used
//! for upfront disclosure; actual provider-reported costs are never
//! authoritative for billing.

use async_trait::async_trait;

use reelgen_models::AspectRatio;

use crate::error::ProviderResult;

/// Options for a chat completion call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for JSON-shaped output.
    pub json_output: bool,
}

/// Result of a chat completion call.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The response coerced to a single string.
    pub content: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Text completion capability.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &ChatOptions,
    ) -> ProviderResult<ChatOutcome>;

    /// Estimated cost in USD for a call of the given token volume.
    fn estimate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64;
}

/// Result of a frame synthesis call.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
}

/// Image synthesis capability. Blocking from the caller's perspective;
/// adapters backed by a queue hide the polling inside the call.
#[async_trait]
pub trait ImageSynthesis: Send + Sync {
    async fn synthesize(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: Option<u64>,
    ) -> ProviderResult<ImageOutcome>;

    /// Estimated cost in USD per generated frame.
    fn estimate_cost(&self, width: u32, height: u32) -> f64;
}

/// Remote queue status for an async submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl RemoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Done | RemoteStatus::Failed)
    }
}

/// Poll result for video synthesis and compilation requests.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub status: RemoteStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

/// One clip submission.
#[derive(Debug, Clone)]
pub struct VideoSubmission {
    pub motion_prompt: String,
    pub start_image_url: String,
    /// Only populated when the adapter advertises end-frame support.
    pub end_image_url: Option<String>,
    pub duration: f64,
    pub aspect_ratio: AspectRatio,
}

/// Video synthesis capability: submit plus poll over a remote queue.
#[async_trait]
pub trait VideoSynthesis: Send + Sync {
    /// Whether submissions may carry an end frame.
    fn supports_end_frame(&self) -> bool;

    /// Submit a clip request; returns the provider's request handle.
    async fn submit(&self, request: &VideoSubmission) -> ProviderResult<String>;

    /// Poll a previously submitted request.
    async fn poll(&self, handle: &str) -> ProviderResult<PollOutcome>;

    /// Estimated cost in USD per clip second.
    fn estimate_cost(&self, duration: f64) -> f64;
}

/// Options for a compilation request.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub fps: Option<u32>,
}

/// Clip compilation capability. Absent entirely when the project selects
/// no compile provider.
#[async_trait]
pub trait Compilation: Send + Sync {
    /// Submit the ordered clip list; returns the provider's request handle.
    async fn submit(
        &self,
        clip_urls: &[String],
        aspect_ratio: AspectRatio,
        options: &CompileOptions,
    ) -> ProviderResult<String>;

    /// Poll a previously submitted compilation.
    async fn poll(&self, handle: &str) -> ProviderResult<PollOutcome>;

    /// Estimated cost in USD for stitching the given number of clips.
    fn estimate_cost(&self, clip_count: usize) -> f64;
}
