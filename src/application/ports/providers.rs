//! Provider Ports - 外部图像描述与语言检测服务
//!
//! 核心只把它们视为一次同步调用 + 可选结果，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// 外部服务错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider is disabled")]
    Disabled,
}

/// Image Describer Port
///
/// 为图片生成替代文本
#[async_trait]
pub trait ImageDescriberPort: Send + Sync {
    /// 无法描述时返回 Ok(None)
    async fn describe_image(&self, image: &[u8]) -> Result<Option<String>, ProviderError>;

    async fn health_check(&self) -> bool {
        true
    }
}

/// Language Detector Port
///
/// 返回原始 JSON 文本（形如 `{"words": [...]}`），解析由调用方完成
#[async_trait]
pub trait LanguageDetectorPort: Send + Sync {
    async fn detect_non_main_language_words(
        &self,
        text: &str,
        main_language: &str,
    ) -> Result<Option<String>, ProviderError>;

    async fn health_check(&self) -> bool {
        true
    }
}
