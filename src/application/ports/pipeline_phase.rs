//! Pipeline Phase Port - 流水线阶段抽象
//!
//! 每个阶段返回显式的结果类型，编排器据此路由：继续、暂停待评审、或失败。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::document::DocumentError;
use crate::domain::processing::{ProcessingContext, ReviewDetails, ReviewKind};

/// 流水线阶段（按执行顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    StoryExtraction,
    ChapterTree,
    ImageCatalog,
    StyleNormalization,
    MetadataGate,
    AltText,
    LangMarkup,
    XhtmlRender,
    TocGeneration,
    EpubAssembly,
}

impl Phase {
    pub const ALL: [Phase; 10] = [
        Phase::StoryExtraction,
        Phase::ChapterTree,
        Phase::ImageCatalog,
        Phase::StyleNormalization,
        Phase::MetadataGate,
        Phase::AltText,
        Phase::LangMarkup,
        Phase::XhtmlRender,
        Phase::TocGeneration,
        Phase::EpubAssembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::StoryExtraction => "story_extraction",
            Phase::ChapterTree => "chapter_tree",
            Phase::ImageCatalog => "image_catalog",
            Phase::StyleNormalization => "style_normalization",
            Phase::MetadataGate => "metadata_gate",
            Phase::AltText => "alt_text",
            Phase::LangMarkup => "lang_markup",
            Phase::XhtmlRender => "xhtml_render",
            Phase::TocGeneration => "toc_generation",
            Phase::EpubAssembly => "epub_assembly",
        }
    }

    /// 在流水线中的位置
    pub fn index(&self) -> usize {
        Phase::ALL
            .iter()
            .position(|p| p == self)
            .unwrap_or_default()
    }

    /// 下一个阶段；最后一个阶段返回 None
    pub fn next(&self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }

    /// 评审通过后重新进入的阶段
    pub fn resume_after(kind: ReviewKind) -> Phase {
        match kind {
            // 元数据由门禁重新校验
            ReviewKind::Metadata => Phase::MetadataGate,
            ReviewKind::AltTexts => Phase::LangMarkup,
            ReviewKind::LangMarkup => Phase::XhtmlRender,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 流水线错误
///
/// 编排器不区分校验失败与意外失败，二者都记录为终态错误
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Phase {phase} failed unexpectedly: {message}")]
    Unexpected { phase: Phase, message: String },

    #[error("Pipeline is not accepting new work")]
    ShuttingDown,

    #[error("Input queue of phase {0} is closed")]
    QueueClosed(Phase),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(phase: Phase, message: impl Into<String>) -> Self {
        Self::Unexpected {
            phase,
            message: message.into(),
        }
    }
}

/// 阶段执行结果
#[derive(Debug)]
pub enum PhaseOutcome {
    /// 交给下一阶段
    Continue(Box<ProcessingContext>),
    /// 移出流水线，等待人工输入
    Suspend {
        context: Box<ProcessingContext>,
        details: ReviewDetails,
    },
    /// 终态失败
    Fail(PipelineError),
}

impl PhaseOutcome {
    pub fn proceed(context: ProcessingContext) -> Self {
        PhaseOutcome::Continue(Box::new(context))
    }

    pub fn suspend(context: ProcessingContext, details: ReviewDetails) -> Self {
        PhaseOutcome::Suspend {
            context: Box::new(context),
            details,
        }
    }

    pub fn fail(error: impl Into<PipelineError>) -> Self {
        PhaseOutcome::Fail(error.into())
    }
}

/// Pipeline Phase Port
///
/// 单个阶段一次只处理一个上下文
#[async_trait]
pub trait PipelinePhase: Send + Sync {
    fn phase(&self) -> Phase;

    async fn run(&self, context: ProcessingContext) -> PhaseOutcome;
}
