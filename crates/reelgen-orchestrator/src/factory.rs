//! Adapter construction seam.
//!
//! Adapter instances are never persisted: every wake-up rebuilds them from
//! the project's closed provider tags plus a fresh credential lookup. The
//! factory trait is the seam tests use to script provider behavior.

use std::sync::Arc;

use reelgen_models::{CompileProviderKind, ImageProviderKind, VideoProviderKind};
use reelgen_providers::{
    build_compile, build_image, build_video, Compilation, ImageSynthesis, ProviderCredentials,
    ProviderResult, VideoSynthesis,
};

pub trait AdapterFactory: Send + Sync {
    fn image(
        &self,
        kind: ImageProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Arc<dyn ImageSynthesis>>;

    fn video(
        &self,
        kind: VideoProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Arc<dyn VideoSynthesis>>;

    fn compile(
        &self,
        kind: CompileProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Option<Arc<dyn Compilation>>>;
}

/// Production factory: the generic HTTP adapters.
pub struct HttpAdapterFactory;

impl AdapterFactory for HttpAdapterFactory {
    fn image(
        &self,
        kind: ImageProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Arc<dyn ImageSynthesis>> {
        build_image(kind, credentials)
    }

    fn video(
        &self,
        kind: VideoProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Arc<dyn VideoSynthesis>> {
        build_video(kind, credentials)
    }

    fn compile(
        &self,
        kind: CompileProviderKind,
        credentials: &ProviderCredentials,
    ) -> ProviderResult<Option<Arc<dyn Compilation>>> {
        build_compile(kind, credentials)
    }
}
