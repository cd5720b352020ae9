//! Event Publisher Implementation
//!
//! 流水线事件广播，供上层（UI / REST）订阅

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::processing::{FileId, ProcessingStatus, ReviewDetails, ReviewKind};

/// 流水线事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PipelineEvent {
    /// 状态变更
    StatusChanged {
        file_id: FileId,
        status: ProcessingStatus,
    },
    /// 暂停等待评审
    Suspended {
        file_id: FileId,
        kind: ReviewKind,
        details: ReviewDetails,
    },
    /// 处理完成
    Completed { file_id: FileId, size: usize },
    /// 处理失败
    Failed { file_id: FileId, error: String },
}

/// 事件发布器
pub struct EventPublisher {
    channel: broadcast::Sender<PipelineEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.channel.subscribe()
    }

    /// 发布状态变更事件
    pub fn publish_status_changed(&self, file_id: FileId, status: ProcessingStatus) {
        self.publish(PipelineEvent::StatusChanged { file_id, status });
    }

    /// 发布暂停事件
    pub fn publish_suspended(&self, file_id: FileId, details: &ReviewDetails) {
        self.publish(PipelineEvent::Suspended {
            file_id,
            kind: details.kind(),
            details: details.clone(),
        });
    }

    /// 发布完成事件
    pub fn publish_completed(&self, file_id: FileId, size: usize) {
        self.publish(PipelineEvent::Completed { file_id, size });
    }

    /// 发布失败事件
    pub fn publish_failed(&self, file_id: FileId, error: &str) {
        self.publish(PipelineEvent::Failed {
            file_id,
            error: error.to_string(),
        });
    }

    fn publish(&self, event: PipelineEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_in_order() {
        let publisher = EventPublisher::new();
        let mut rx = publisher.subscribe();
        let id = FileId::new();

        publisher.publish_status_changed(id, ProcessingStatus::InProgress);
        publisher.publish_suspended(id, &ReviewDetails::LangMarkup { flagged: 2 });

        assert_eq!(
            rx.recv().await.unwrap(),
            PipelineEvent::StatusChanged {
                file_id: id,
                status: ProcessingStatus::InProgress
            }
        );
        match rx.recv().await.unwrap() {
            PipelineEvent::Suspended { kind, .. } => assert_eq!(kind, ReviewKind::LangMarkup),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new();
        publisher.publish_failed(FileId::new(), "boom");
    }

    #[test]
    fn test_event_json_shape() {
        let id = FileId::new();
        let json = serde_json::to_value(PipelineEvent::Completed { file_id: id, size: 3 }).unwrap();
        assert_eq!(json["event"], "Completed");
        assert_eq!(json["data"]["size"], 3);
    }
}
