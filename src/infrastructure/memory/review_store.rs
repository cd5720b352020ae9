//! In-Memory Pending Review Store Implementation

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::PendingReviewStorePort;
use crate::domain::processing::{FileId, ProcessingContext, ReviewKind};

/// 内存待评审存储
pub struct InMemoryPendingReviewStore {
    kind: ReviewKind,
    /// file_id -> 暂停的上下文
    contexts: DashMap<FileId, ProcessingContext>,
}

impl InMemoryPendingReviewStore {
    pub fn new(kind: ReviewKind) -> Self {
        Self {
            kind,
            contexts: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl PendingReviewStorePort for InMemoryPendingReviewStore {
    fn kind(&self) -> ReviewKind {
        self.kind
    }

    fn store(&self, context: ProcessingContext) {
        let file_id = context.file_id;
        self.contexts.insert(file_id, context);
        tracing::debug!(file_id = %file_id, review = self.kind.as_str(), "Context parked");
    }

    fn get(&self, id: &FileId) -> Option<ProcessingContext> {
        self.contexts.get(id).map(|c| c.clone())
    }

    fn remove(&self, id: &FileId) -> Option<ProcessingContext> {
        self.contexts.remove(id).map(|(_, context)| context)
    }

    fn list_ids(&self) -> Vec<FileId> {
        self.contexts.iter().map(|entry| *entry.key()).collect()
    }

    fn contains(&self, id: &FileId) -> bool {
        self.contexts.contains_key(id)
    }
}
