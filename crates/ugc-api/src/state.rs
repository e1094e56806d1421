//! Application state.

use std::sync::Arc;

use ugc_media::ImageEnhancer;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub enhancer: Arc<ImageEnhancer>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            enhancer: Arc::new(ImageEnhancer::new()),
        }
    }
}
