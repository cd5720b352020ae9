//! Sled-based Image Description Cache
//!
//! key: `desc:<md5>`，value: bincode 编码的条目，按最近访问时间淘汰

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::application::ports::{CacheError, CacheStats, DescriptionCachePort};

const KEY_PREFIX: &str = "desc:";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大条目数
    pub max_entries: usize,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/descriptions.sled".to_string(),
            max_entries: 10_000,
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    description: String,
    last_accessed: i64,
    created_at: i64,
}

/// Sled 图片描述缓存
pub struct SledDescriptionCache {
    db: Db,
    max_entries: usize,
    entry_count: AtomicUsize,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

fn db_error(e: sled::Error) -> CacheError {
    CacheError::DatabaseError(e.to_string())
}

fn encode(entry: &InternalCacheEntry) -> Result<Vec<u8>, CacheError> {
    bincode::serialize(entry).map_err(|e| CacheError::SerializationError(e.to_string()))
}

fn decode(bytes: &[u8]) -> Result<InternalCacheEntry, CacheError> {
    bincode::deserialize(bytes).map_err(|e| CacheError::SerializationError(e.to_string()))
}

impl SledDescriptionCache {
    pub fn new(config: &SledCacheConfig) -> Result<Self, CacheError> {
        let db = sled::open(&config.db_path).map_err(db_error)?;
        let entry_count = db.scan_prefix(KEY_PREFIX).count();

        tracing::info!(
            db_path = %config.db_path,
            max_entries = config.max_entries,
            entries = entry_count,
            "SledDescriptionCache initialized"
        );

        Ok(Self {
            db,
            max_entries: config.max_entries.max(1),
            entry_count: AtomicUsize::new(entry_count),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    /// 打开现有缓存
    pub fn open<P: AsRef<Path>>(path: P, max_entries: usize) -> Result<Self, CacheError> {
        let config = SledCacheConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_entries,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 淘汰最久未访问的条目
    fn evict_lru(&self) -> Result<(), CacheError> {
        let mut oldest: Option<(sled::IVec, i64)> = None;

        for item in self.db.scan_prefix(KEY_PREFIX) {
            let (key, value) = item.map_err(db_error)?;
            let Ok(entry) = decode(&value) else {
                continue;
            };
            let is_older = oldest
                .as_ref()
                .map(|(_, accessed)| entry.last_accessed < *accessed)
                .unwrap_or(true);
            if is_older {
                oldest = Some((key, entry.last_accessed));
            }
        }

        if let Some((key, _)) = oldest {
            if self.db.remove(&key).map_err(db_error)?.is_some() {
                self.entry_count.fetch_sub(1, Ordering::Relaxed);
            }
            tracing::debug!(key = %String::from_utf8_lossy(&key), "LRU evicted description");
        }
        Ok(())
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), CacheError> {
        self.db.flush().map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl DescriptionCachePort for SledDescriptionCache {
    async fn get(&self, cache_key: &str) -> Result<Option<String>, CacheError> {
        let key = format!("{}{}", KEY_PREFIX, cache_key);

        match self.db.get(&key).map_err(db_error)? {
            Some(data) => {
                let mut entry = decode(&data)?;

                // LRU touch
                entry.last_accessed = Utc::now().timestamp_millis();
                self.db.insert(&key, encode(&entry)?).map_err(db_error)?;

                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.description))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, cache_key: &str, description: &str) -> Result<(), CacheError> {
        let key = format!("{}{}", KEY_PREFIX, cache_key);
        let exists = self.db.contains_key(&key).map_err(db_error)?;

        if !exists {
            while self.entry_count.load(Ordering::Relaxed) >= self.max_entries {
                let before = self.entry_count.load(Ordering::Relaxed);
                self.evict_lru()?;
                if self.entry_count.load(Ordering::Relaxed) == before {
                    break;
                }
            }
        }

        let now = Utc::now().timestamp_millis();
        let entry = InternalCacheEntry {
            description: description.to_string(),
            last_accessed: now,
            created_at: now,
        };
        if self.db.insert(&key, encode(&entry)?).map_err(db_error)?.is_none() {
            self.entry_count.fetch_add(1, Ordering::Relaxed);
        }

        tracing::debug!(cache_key = %cache_key, "Description cached");
        Ok(())
    }

    async fn remove(&self, cache_key: &str) -> Result<(), CacheError> {
        let key = format!("{}{}", KEY_PREFIX, cache_key);
        if self.db.remove(&key).map_err(db_error)?.is_some() {
            self.entry_count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.entry_count.load(Ordering::Relaxed),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
