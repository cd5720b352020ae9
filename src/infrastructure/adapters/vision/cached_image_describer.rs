//! Cached Image Describer - 按图片内容哈希缓存描述
//!
//! 缓存读写失败只记录日志，不影响描述结果

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::ports::{
    generate_cache_key, DescriptionCachePort, ImageDescriberPort, ProviderError,
};

pub struct CachedImageDescriber {
    inner: Arc<dyn ImageDescriberPort>,
    cache: Arc<dyn DescriptionCachePort>,
}

impl CachedImageDescriber {
    pub fn new(inner: Arc<dyn ImageDescriberPort>, cache: Arc<dyn DescriptionCachePort>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ImageDescriberPort for CachedImageDescriber {
    async fn describe_image(&self, image: &[u8]) -> Result<Option<String>, ProviderError> {
        let cache_key = generate_cache_key(image);

        match self.cache.get(&cache_key).await {
            Ok(Some(description)) => {
                tracing::debug!(cache_key = %cache_key, "Description cache hit");
                return Ok(Some(description));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(cache_key = %cache_key, error = %e, "Description cache read failed"),
        }

        let description = self.inner.describe_image(image).await?;
        if let Some(text) = &description {
            if let Err(e) = self.cache.put(&cache_key, text).await {
                tracing::warn!(cache_key = %cache_key, error = %e, "Description cache write failed");
            }
        }
        Ok(description)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}
