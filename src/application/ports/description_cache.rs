//! Description Cache Port - 图片描述缓存
//!
//! 定义图片描述缓存的抽象接口，具体实现使用 Sled

use async_trait::async_trait;
use thiserror::Error;

/// Description Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 缓存统计信息
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: usize,
    pub hit_count: u64,
    pub miss_count: u64,
}

/// Description Cache Port
///
/// 基于图片内容哈希的持久缓存
/// - 缓存 key: md5(image bytes)
#[async_trait]
pub trait DescriptionCachePort: Send + Sync {
    async fn get(&self, cache_key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, cache_key: &str, description: &str) -> Result<(), CacheError>;

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError>;

    async fn stats(&self) -> CacheStats;
}

/// 生成缓存 key
pub fn generate_cache_key(image: &[u8]) -> String {
    let digest = md5::compute(image);
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_depends_on_content_only() {
        let a = generate_cache_key(b"image-bytes");
        let b = generate_cache_key(b"image-bytes");
        let c = generate_cache_key(b"other-bytes");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
