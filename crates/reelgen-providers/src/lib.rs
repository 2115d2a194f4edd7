//! Provider adapters for the reelgen pipeline.
//!
//! This crate provides:
//! - The four capability traits the core consumes (text, image, video, compile)
//! - The provider error taxonomy with retryable/permanent classification
//! - Retry with exponential backoff and jitter
//! - The credential-store lookup contract
//! - Generic HTTP adapters for gateways speaking vendor-neutral wire shapes
//! - Bundle construction from closed provider tags, and cost estimation

pub mod bundle;
pub mod credentials;
pub mod error;
pub mod http;
pub mod retry;
pub mod throttle;
pub mod traits;

pub use bundle::{
    build_compile, build_image, build_text, build_video, CostBreakdown, ProviderBundle,
};
pub use credentials::{
    Capability, CredentialStore, EnvCredentialStore, MemoryCredentialStore, ProviderCredentials,
};
pub use error::{ProviderError, ProviderResult};
pub use http::{HttpCompilation, HttpImageSynthesis, HttpTextCompletion, HttpVideoSynthesis};
pub use retry::{with_retry, RetryPolicy};
pub use throttle::ProviderThrottle;
pub use traits::{
    ChatOptions, ChatOutcome, Compilation, CompileOptions, ImageOutcome, ImageSynthesis,
    PollOutcome, RemoteStatus, TextCompletion, VideoSubmission, VideoSynthesis,
};
