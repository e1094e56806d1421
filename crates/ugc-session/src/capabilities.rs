//! Capability boundaries the session drives.
//!
//! Each boundary is a trait so any concrete engine is substitutable; the
//! shipped implementations wrap the `ugc-media` executors and move CPU-bound
//! work off the async reactor.

use async_trait::async_trait;

use ugc_media::{ImageEnhancer, MediaError, MediaResult, VideoSynthesizer};
use ugc_models::{EnhancementParameters, VideoSynthesisParameters};

/// Raster enhancement capability.
#[async_trait]
pub trait EnhanceCapability: Send + Sync {
    async fn enhance(
        &self,
        source: &[u8],
        params: &EnhancementParameters,
    ) -> MediaResult<Vec<u8>>;
}

/// Still-to-video encoding capability.
#[async_trait]
pub trait SynthesisCapability: Send + Sync {
    async fn synthesize(
        &self,
        still: &[u8],
        params: &VideoSynthesisParameters,
    ) -> MediaResult<Vec<u8>>;
}

/// In-process enhancer backed by the `image`-crate pipeline.
#[derive(Debug, Default, Clone)]
pub struct LocalEnhancer {
    inner: ImageEnhancer,
}

impl LocalEnhancer {
    pub fn new() -> Self {
        Self {
            inner: ImageEnhancer::new(),
        }
    }
}

#[async_trait]
impl EnhanceCapability for LocalEnhancer {
    async fn enhance(
        &self,
        source: &[u8],
        params: &EnhancementParameters,
    ) -> MediaResult<Vec<u8>> {
        let enhancer = self.inner.clone();
        let source = source.to_vec();
        let params = *params;
        tokio::task::spawn_blocking(move || enhancer.enhance(&source, &params))
            .await
            .map_err(|e| MediaError::internal(format!("enhance task panicked: {}", e)))?
    }
}

#[async_trait]
impl SynthesisCapability for VideoSynthesizer {
    async fn synthesize(
        &self,
        still: &[u8],
        params: &VideoSynthesisParameters,
    ) -> MediaResult<Vec<u8>> {
        VideoSynthesizer::synthesize(self, still, params).await
    }
}
