//! Image Requests
//!
//! Immutable request descriptions and loader configuration. The pool and
//! counter are built from config at loader start instead of living as
//! process globals, so tests get isolated instances.

use serde::{Deserialize, Serialize};

use pica_memory::BitmapPool;

use crate::drawable::Drawable;
use crate::error::LoadError;
use crate::target::RequestTarget;
use crate::transition::Transition;

/// Pool retention limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum bytes retained across all buckets
    pub max_bytes: usize,
    /// Maximum buffers retained per size bucket
    pub max_per_bucket: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_bytes: 128 * 1024 * 1024,
            max_per_bucket: 64,
        }
    }
}

/// Loader-wide configuration, applied once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub pool: PoolConfig,
    /// Default cross-fade length in milliseconds for animated requests
    pub crossfade_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            crossfade_ms: 100,
        }
    }
}

impl LoaderConfig {
    /// Build the shared bitmap pool this config describes.
    pub fn new_pool(&self) -> BitmapPool {
        BitmapPool::new(self.pool.max_per_bucket, self.pool.max_bytes)
    }
}

/// One image load, immutable once issued.
pub struct ImageRequest {
    pub url: String,
    /// Desired display size; `None` decodes at the intrinsic size
    pub size: Option<(u32, u32)>,
    pub placeholder: Option<Drawable>,
    pub transition: Transition,
    pub target: RequestTarget,
}

impl ImageRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size: None,
            placeholder: None,
            transition: Transition::None,
            target: RequestTarget::None,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_placeholder(mut self, placeholder: Drawable) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_target(mut self, target: RequestTarget) -> Self {
        self.target = target;
        self
    }

    /// Memory-cache key for this request's decoded result.
    pub fn cache_key(&self) -> String {
        match self.size {
            Some((w, h)) => format!("{}@{}x{}", self.url, w, h),
            None => self.url.clone(),
        }
    }

    /// Reject requests the pipeline cannot service.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.url.is_empty() {
            return Err(LoadError::InvalidRequest("empty url".into()));
        }
        if let Some((w, h)) = self.size {
            if w == 0 || h == 0 {
                return Err(LoadError::InvalidRequest("zero-sized target".into()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ImageRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageRequest")
            .field("url", &self.url)
            .field("size", &self.size)
            .field("transition", &self.transition)
            .field("target", &self.target.kind_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = ImageRequest::new("https://example.com/cat.png")
            .with_size(320, 240)
            .with_transition(Transition::crossfade());

        assert_eq!(req.size, Some((320, 240)));
        assert!(!req.transition.is_none());
        assert_eq!(req.cache_key(), "https://example.com/cat.png@320x240");
    }

    #[test]
    fn test_cache_key_without_size() {
        let req = ImageRequest::new("file:///a.jpg");
        assert_eq!(req.cache_key(), "file:///a.jpg");
    }

    #[test]
    fn test_validation() {
        assert!(ImageRequest::new("x").validate().is_ok());
        assert!(ImageRequest::new("").validate().is_err());
        assert!(ImageRequest::new("x").with_size(0, 10).validate().is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.pool.max_bytes, 128 * 1024 * 1024);
        assert_eq!(config.pool.max_per_bucket, 64);
        assert_eq!(config.crossfade_ms, 100);
        assert_eq!(config.new_pool().stats().max_bytes, config.pool.max_bytes);
    }
}
