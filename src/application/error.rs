//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::PipelineError;
use crate::domain::processing::{FileId, ReviewKind};

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 从未提交过的 id
    #[error("File not found: {0}")]
    NotFound(FileId),

    /// id 已知，但不在对应的待评审存储中
    #[error("File {id} is not awaiting {kind} review")]
    NotPending { id: FileId, kind: &'static str },

    /// 评审编辑引用了不存在的出现序号
    #[error("Invalid occurrence index {index} (available: {available})")]
    InvalidOccurrence { index: usize, available: usize },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 流水线错误
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    pub fn not_pending(id: FileId, kind: ReviewKind) -> Self {
        Self::NotPending {
            id,
            kind: kind.as_str(),
        }
    }

    pub fn invalid_occurrence(index: usize, available: usize) -> Self {
        Self::InvalidOccurrence { index, available }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}
