//! Processing Context - 处理上下文
//!
//! 职责:
//! - 工作单元（ProcessingContext）
//! - 处理状态与终态结果
//! - 评审类型与暂停细节

mod context;
mod status;
mod value_objects;

pub use context::{ProcessingContext, UploadSeed};
pub use status::{ProcessedResult, ProcessingStatus, ReviewDetails, ReviewKind};
pub use value_objects::{metadata_keys, FileId};
