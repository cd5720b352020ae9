//! Pipeline Runner Port - 提交与重新进入流水线
//!
//! 命令处理器通过它与编排器交互，具体实现在 infrastructure/worker

use async_trait::async_trait;

use super::pipeline_phase::{Phase, PipelineError};
use crate::domain::processing::{FileId, ProcessingContext};

#[async_trait]
pub trait PipelineRunnerPort: Send + Sync {
    /// 新上下文进入第一个阶段，状态置为 InProgress
    async fn submit(&self, context: ProcessingContext) -> Result<FileId, PipelineError>;

    /// 评审通过的上下文进入指定阶段
    async fn resubmit(&self, context: ProcessingContext, phase: Phase)
        -> Result<(), PipelineError>;

    /// 关闭开始后返回 false
    fn is_accepting(&self) -> bool;
}
