//! Review Store Ports - 待评审存储与结果/状态存储
//!
//! 定义抽象接口，具体实现在 infrastructure/memory 层。
//! 流水线 worker 与外部请求会并发访问这些存储。

use std::sync::Arc;

use crate::domain::processing::{
    FileId, ProcessedResult, ProcessingContext, ProcessingStatus, ReviewKind,
};

/// Pending Review Store Port
///
/// 每种评审类型一个实例，以 file id 为键暂存上下文
pub trait PendingReviewStorePort: Send + Sync {
    fn kind(&self) -> ReviewKind;

    /// 暂存上下文（同 id 覆盖）
    fn store(&self, context: ProcessingContext);

    /// 获取上下文副本
    fn get(&self, id: &FileId) -> Option<ProcessingContext>;

    /// 取出并删除
    fn remove(&self, id: &FileId) -> Option<ProcessingContext>;

    fn list_ids(&self) -> Vec<FileId>;

    fn contains(&self, id: &FileId) -> bool {
        self.get(id).is_some()
    }
}

/// Result Store Port
///
/// 保存用户可见状态与终态结果
pub trait ResultStorePort: Send + Sync {
    fn set_status(&self, id: FileId, status: ProcessingStatus);

    /// 未知 id 返回 None
    fn get_status(&self, id: &FileId) -> Option<ProcessingStatus>;

    /// 记录成功结果，同时状态置为 Ready
    fn store_result(&self, id: FileId, payload: Vec<u8>);

    /// 记录错误，同时状态置为 Error
    fn store_error(&self, id: FileId, message: String);

    fn get_result(&self, id: &FileId) -> Option<ProcessedResult>;

    fn list_ids(&self) -> Vec<FileId>;
}

/// 三种评审各自的待评审存储
#[derive(Clone)]
pub struct PendingReviewStores {
    pub metadata: Arc<dyn PendingReviewStorePort>,
    pub alt_texts: Arc<dyn PendingReviewStorePort>,
    pub lang_markup: Arc<dyn PendingReviewStorePort>,
}

impl PendingReviewStores {
    pub fn for_kind(&self, kind: ReviewKind) -> &Arc<dyn PendingReviewStorePort> {
        match kind {
            ReviewKind::Metadata => &self.metadata,
            ReviewKind::AltTexts => &self.alt_texts,
            ReviewKind::LangMarkup => &self.lang_markup,
        }
    }

    /// 查找持有该 id 的存储
    pub fn locate(&self, id: &FileId) -> Option<ReviewKind> {
        ReviewKind::ALL
            .into_iter()
            .find(|kind| self.for_kind(*kind).contains(id))
    }
}
