//! Events - 流水线事件推送

mod publisher;

pub use publisher::{EventPublisher, PipelineEvent};
