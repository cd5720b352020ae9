//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::processing::metadata_keys;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `PUBLISH_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `PUBLISH_PIPELINE__DEFAULT_LANGUAGE=sv`
/// - `PUBLISH_VISION__ENABLED=true`
/// - `PUBLISH_VISION__URL=http://vision:8000/v1`
/// - `PUBLISH_METADATA__PUBLISHER=Kustantamo`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("pipeline.queue_capacity", 32)?
        .set_default("pipeline.shutdown_timeout_secs", 10)?
        .set_default("pipeline.default_language", "fi")?
        .set_default("pipeline.review.alt_texts", true)?
        .set_default("pipeline.review.lang_markup", true)?
        .set_default("vision.enabled", false)?
        .set_default("vision.url", "http://localhost:11434/v1")?
        .set_default("vision.model", "llava")?
        .set_default("vision.timeout_secs", 60)?
        .set_default("language.enabled", false)?
        .set_default("language.url", "http://localhost:11434/v1")?
        .set_default("language.model", "llama3")?
        .set_default("language.timeout_secs", 60)?
        .set_default("cache.enabled", true)?
        .set_default("cache.path", "data/descriptions.sled")?
        .set_default("cache.max_entries", 10_000)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 例如: PUBLISH_VISION__URL=http://vision:8000/v1
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("PUBLISH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.pipeline.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Pipeline queue capacity cannot be 0".to_string(),
        ));
    }

    if config.pipeline.default_language.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Default language cannot be empty".to_string(),
        ));
    }

    for (name, provider) in [("vision", &config.vision), ("language", &config.language)] {
        if provider.enabled && (provider.url.is_empty() || provider.model.is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "{} provider needs both url and model when enabled",
                name
            )));
        }
    }

    if config.cache.enabled && config.cache.max_entries == 0 {
        return Err(ConfigError::ValidationError(
            "Cache max_entries cannot be 0 when cache is enabled".to_string(),
        ));
    }

    if let Some(key) = config
        .metadata
        .keys()
        .find(|key| key.starts_with(metadata_keys::BOOKKEEPING_PREFIX))
    {
        return Err(ConfigError::ValidationError(format!(
            "Default metadata key '{}' is reserved",
            key
        )));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Queue Capacity: {}", config.pipeline.queue_capacity);
    tracing::info!("Default Language: {}", config.pipeline.default_language);
    tracing::info!(
        "Review: alt_texts={} lang_markup={}",
        config.pipeline.review.alt_texts,
        config.pipeline.review.lang_markup
    );
    tracing::info!("Vision Enabled: {}", config.vision.enabled);
    if config.vision.enabled {
        tracing::info!("Vision: {} ({})", config.vision.url, config.vision.model);
    }
    tracing::info!("Language Enabled: {}", config.language.enabled);
    if config.language.enabled {
        tracing::info!("Language: {} ({})", config.language.url, config.language.model);
    }
    tracing::info!("Description Cache: {:?}", config.cache.path);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
