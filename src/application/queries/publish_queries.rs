//! Publish Queries - 状态、结果与评审查询

use crate::domain::processing::{FileId, ReviewKind};

/// 获取处理状态
#[derive(Debug, Clone)]
pub struct GetStatus {
    pub file_id: FileId,
}

/// 获取终态结果
#[derive(Debug, Clone)]
pub struct GetResult {
    pub file_id: FileId,
}

/// 列出某种评审的待处理 id
#[derive(Debug, Clone)]
pub struct ListPending {
    pub kind: ReviewKind,
}

/// 列出待确认替代文本的图片出现项
#[derive(Debug, Clone)]
pub struct ListImageOccurrences {
    pub file_id: FileId,
}

/// 列出待确认的语言标记出现项
#[derive(Debug, Clone)]
pub struct ListLangMarkupOccurrences {
    pub file_id: FileId,
}

/// 获取暂停细节
#[derive(Debug, Clone)]
pub struct GetPendingDetails {
    pub file_id: FileId,
}
