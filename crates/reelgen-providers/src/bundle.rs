//! Provider bundle: constructing the four capability adapters from a
//! project's closed selection tags plus a fresh credential lookup.
//!
//! Adapter instances are never persisted; the orchestrator rebuilds them on
//! every resume from the persisted tags and the credential store.

use std::sync::Arc;

use serde::Serialize;

use reelgen_models::{
    AspectRatio, CompileProviderKind, ImageProviderKind, Plan, ProviderSelection,
    TextProviderKind, VideoProviderKind,
};

use crate::credentials::{Capability, CredentialStore, ProviderCredentials};
use crate::error::{ProviderError, ProviderResult};
use crate::http::{HttpCompilation, HttpImageSynthesis, HttpTextCompletion, HttpVideoSynthesis};
use crate::traits::{Compilation, ImageSynthesis, TextCompletion, VideoSynthesis};

// Fixed token volume assumed for one direction pass.
const ESTIMATE_INPUT_TOKENS: u64 = 2000;
const ESTIMATE_OUTPUT_TOKENS: u64 = 2000;

/// Build a text adapter for a closed tag.
pub fn build_text(
    kind: TextProviderKind,
    credentials: &ProviderCredentials,
) -> ProviderResult<Arc<dyn TextCompletion>> {
    match kind {
        TextProviderKind::OpenaiCompatible => Ok(Arc::new(HttpTextCompletion::new(credentials)?)),
    }
}

/// Build an image adapter for a closed tag.
pub fn build_image(
    kind: ImageProviderKind,
    credentials: &ProviderCredentials,
) -> ProviderResult<Arc<dyn ImageSynthesis>> {
    match kind {
        ImageProviderKind::Http => Ok(Arc::new(HttpImageSynthesis::new(credentials)?)),
    }
}

/// Build a video adapter for a closed tag.
pub fn build_video(
    kind: VideoProviderKind,
    credentials: &ProviderCredentials,
) -> ProviderResult<Arc<dyn VideoSynthesis>> {
    match kind {
        VideoProviderKind::FrameBridge | VideoProviderKind::MotionOnly => Ok(Arc::new(
            HttpVideoSynthesis::new(credentials, kind.supports_end_frame())?,
        )),
    }
}

/// Build a compile adapter for a closed tag; `None` disables the phase.
pub fn build_compile(
    kind: CompileProviderKind,
    credentials: &ProviderCredentials,
) -> ProviderResult<Option<Arc<dyn Compilation>>> {
    match kind {
        CompileProviderKind::None => Ok(None),
        CompileProviderKind::Http => Ok(Some(Arc::new(HttpCompilation::new(credentials)?))),
    }
}

/// The four-capability adapter set resolved for one owner.
pub struct ProviderBundle {
    pub text: Arc<dyn TextCompletion>,
    pub image: Arc<dyn ImageSynthesis>,
    pub video: Arc<dyn VideoSynthesis>,
    pub compile: Option<Arc<dyn Compilation>>,
}

impl std::fmt::Debug for ProviderBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBundle")
            .field("compile", &self.compile.is_some())
            .finish()
    }
}

impl ProviderBundle {
    /// Resolve every capability for an owner in one pass. Used by the
    /// director for cost disclosure; the orchestrator resolves capabilities
    /// one phase at a time instead.
    pub async fn resolve(
        selection: &ProviderSelection,
        owner_id: &str,
        credentials: &dyn CredentialStore,
    ) -> ProviderResult<Self> {
        let text_creds = credentials
            .lookup(owner_id, Capability::Text)
            .await?
            .ok_or(ProviderError::MissingCredentials(Capability::Text))?;
        let image_creds = credentials
            .lookup(owner_id, Capability::Image)
            .await?
            .ok_or(ProviderError::MissingCredentials(Capability::Image))?;
        let video_creds = credentials
            .lookup(owner_id, Capability::Video)
            .await?
            .ok_or(ProviderError::MissingCredentials(Capability::Video))?;

        let compile = if selection.compile.is_none() {
            None
        } else {
            let compile_creds = credentials
                .lookup(owner_id, Capability::Compile)
                .await?
                .ok_or(ProviderError::MissingCredentials(Capability::Compile))?;
            build_compile(selection.compile, &compile_creds)?
        };

        Ok(Self {
            text: build_text(selection.text, &text_creds)?,
            image: build_image(selection.image, &image_creds)?,
            video: build_video(selection.video, &video_creds)?,
            compile,
        })
    }

    /// Upfront cost disclosure for running a plan through this bundle:
    /// two frames and one clip per shot, one optional compile, plus a
    /// fixed-size direction pass.
    pub fn estimate(&self, plan: &Plan, aspect_ratio: AspectRatio) -> CostBreakdown {
        let (width, height) = aspect_ratio.dimensions();
        let shot_count = plan.shot_count() as u32;

        let text_usd = self
            .text
            .estimate_cost(ESTIMATE_INPUT_TOKENS, ESTIMATE_OUTPUT_TOKENS);
        let images_usd = 2.0 * shot_count as f64 * self.image.estimate_cost(width, height);
        let videos_usd = plan
            .iter_shots()
            .map(|(_, shot)| self.video.estimate_cost(shot.duration))
            .sum::<f64>();
        let compile_usd = self
            .compile
            .as_ref()
            .map(|c| c.estimate_cost(shot_count as usize))
            .unwrap_or(0.0);

        CostBreakdown {
            text_usd,
            images_usd,
            videos_usd,
            compile_usd,
            total_usd: text_usd + images_usd + videos_usd + compile_usd,
            image_count: 2 * shot_count,
            video_count: shot_count,
        }
    }
}

/// Estimated spend for one run, by capability.
#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdown {
    pub text_usd: f64,
    pub images_usd: f64,
    pub videos_usd: f64,
    pub compile_usd: f64,
    pub total_usd: f64,
    pub image_count: u32,
    pub video_count: u32,
}
