//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（阶段、待评审存储、外部服务、描述缓存）
//! - phases: 十个流水线阶段
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod phases;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    handlers::{
        ApproveAltTextsHandler, ApproveLangMarkupHandler, ProvideMetadataHandler,
        SubmitPackageHandler,
    },
    ApproveAltTexts, ApproveLangMarkup, ProvideMetadata, ResumeResponse, SubmitPackage,
    SubmitPackageResponse,
};

pub use error::ApplicationError;

pub use phases::{build_phases, PhaseSettings};

pub use ports::{
    generate_cache_key, CacheError, CacheStats, DescriptionCachePort, ImageDescriberPort,
    LanguageDetectorPort, PendingReviewStorePort, PendingReviewStores, Phase, PhaseOutcome,
    PipelineError, PipelinePhase, PipelineRunnerPort, ProviderError, ResultStorePort,
};

pub use queries::{
    handlers::{
        GetPendingDetailsHandler, GetResultHandler, GetStatusHandler,
        ListImageOccurrencesHandler, ListLangMarkupOccurrencesHandler, ListPendingHandler,
        PendingDetailsResponse,
    },
    GetPendingDetails, GetResult, GetStatus, ListImageOccurrences, ListLangMarkupOccurrences,
    ListPending,
};
