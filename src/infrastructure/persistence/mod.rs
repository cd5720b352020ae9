//! Persistence Layer - 数据持久化
//!
//! Sled 描述缓存与调试快照

pub mod sled;
pub mod snapshot;

pub use self::sled::{SledCacheConfig, SledDescriptionCache};
pub use snapshot::{read_snapshot, snapshot_path, write_snapshot, SnapshotError};
