//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod description_cache;
mod pipeline_phase;
mod pipeline_runner;
mod providers;
mod review_store;

pub use description_cache::{generate_cache_key, CacheError, CacheStats, DescriptionCachePort};
pub use pipeline_phase::{Phase, PhaseOutcome, PipelineError, PipelinePhase};
pub use pipeline_runner::PipelineRunnerPort;
pub use providers::{ImageDescriberPort, LanguageDetectorPort, ProviderError};
pub use review_store::{PendingReviewStorePort, PendingReviewStores, ResultStorePort};
