//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::phases::PhaseSettings;
use crate::infrastructure::adapters::ChatClientConfig;
use crate::infrastructure::persistence::SledCacheConfig;
use crate::infrastructure::worker::PipelineConfig;

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 流水线配置
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// 图片描述服务
    #[serde(default = "default_vision")]
    pub vision: ProviderConfig,

    /// 语言检测服务
    #[serde(default = "default_language")]
    pub language: ProviderConfig,

    /// 图片描述缓存
    #[serde(default)]
    pub cache: CacheConfig,

    /// 提交时补全的默认 Dublin Core 元数据
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineSection::default(),
            vision: default_vision(),
            language: default_language(),
            cache: CacheConfig::default(),
            metadata: BTreeMap::new(),
            log: LogConfig::default(),
        }
    }
}

/// 流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// 每个阶段输入队列的容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 关闭时等待 worker 的时间（秒）
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// 元数据缺少 language 时使用的主语言
    #[serde(default = "default_main_language")]
    pub default_language: String,

    /// 暂停时写入上下文快照的目录
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,

    #[serde(default)]
    pub review: ReviewConfig,
}

fn default_queue_capacity() -> usize {
    32
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_main_language() -> String {
    "fi".to_string()
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            default_language: default_main_language(),
            snapshot_dir: None,
            review: ReviewConfig::default(),
        }
    }
}

impl PipelineSection {
    pub fn phase_settings(&self) -> PhaseSettings {
        PhaseSettings {
            default_language: self.default_language.clone(),
            review_alt_texts: self.review.alt_texts,
            review_lang_markup: self.review.lang_markup,
        }
    }

    pub fn orchestrator_config(&self) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: self.queue_capacity,
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }
}

/// 哪些提议需要人工确认
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_true")]
    pub alt_texts: bool,

    #[serde(default = "default_true")]
    pub lang_markup: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            alt_texts: true,
            lang_markup: true,
        }
    }
}

/// OpenAI 兼容服务配置
///
/// 未启用时流水线使用不产生任何提议的离线实现
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    /// 服务基础 URL（不含 `/chat/completions`）
    #[serde(default = "default_provider_url")]
    pub url: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// 请求超时时间（秒）
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

fn default_vision() -> ProviderConfig {
    ProviderConfig {
        model: "llava".to_string(),
        ..ProviderConfig::default()
    }
}

fn default_language() -> ProviderConfig {
    ProviderConfig {
        model: "llama3".to_string(),
        ..ProviderConfig::default()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_provider_url(),
            model: String::new(),
            api_key: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn chat_config(&self) -> ChatClientConfig {
        let config = ChatClientConfig::new(&self.url, &self.model).with_timeout(self.timeout_secs);
        match self.api_key.as_deref().filter(|key| !key.is_empty()) {
            Some(key) => config.with_api_key(key),
            None => config,
        }
    }
}

/// 图片描述缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sled 数据库路径
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// 最大条目数
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/descriptions.sled")
}

fn default_cache_max_entries() -> usize {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_cache_path(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn sled_config(&self) -> SledCacheConfig {
        SledCacheConfig {
            db_path: self.path.to_string_lossy().to_string(),
            max_entries: self.max_entries,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.default_language, "fi");
        assert!(config.pipeline.review.alt_texts);
        assert!(config.pipeline.review.lang_markup);
        assert!(!config.vision.enabled);
        assert_eq!(config.vision.model, "llava");
        assert!(config.metadata.is_empty());
    }

    #[test]
    fn test_pipeline_conversions() {
        let mut section = PipelineSection::default();
        section.review.lang_markup = false;
        section.shutdown_timeout_secs = 3;

        let settings = section.phase_settings();
        assert!(settings.review_alt_texts);
        assert!(!settings.review_lang_markup);
        assert_eq!(
            section.orchestrator_config().shutdown_timeout,
            Duration::from_secs(3)
        );
    }
}
