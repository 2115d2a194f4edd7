//! Generic HTTP adapters.
//!
//! These speak deliberately vendor-neutral wire shapes: the base URL, token
//! and model come from the owner's credential lookup, so any gateway that
//! matches the shape works. Vendor-specific adapters live outside the core.

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, ProviderResult};

pub mod compile;
pub mod image;
pub mod text;
pub mod video;

pub use compile::HttpCompilation;
pub use image::HttpImageSynthesis;
pub use text::HttpTextCompletion;
pub use video::HttpVideoSynthesis;

/// Per-call deadline applied to every adapter request.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Build a reqwest client with the adapter deadline.
pub(crate) fn build_client(timeout: Duration) -> ProviderResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ProviderError::from)
}

/// Map a non-success response to the error taxonomy, truncating the body.
pub(crate) async fn error_for_status(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > 512 {
        body.truncate(512);
    }
    ProviderError::http(status, body)
}
