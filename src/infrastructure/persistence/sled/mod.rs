//! Sled 嵌入式存储

mod description_cache;

pub use description_cache::{SledCacheConfig, SledDescriptionCache};
