//! In-Memory Result Store Implementation

use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::ResultStorePort;
use crate::domain::processing::{FileId, ProcessedResult, ProcessingStatus};

/// 内存状态与结果存储
pub struct InMemoryResultStore {
    /// file_id -> 当前状态
    statuses: DashMap<FileId, ProcessingStatus>,
    /// file_id -> 终态记录
    results: DashMap<FileId, ProcessedResult>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self {
            statuses: DashMap::new(),
            results: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultStorePort for InMemoryResultStore {
    fn set_status(&self, id: FileId, status: ProcessingStatus) {
        let old_status = self.statuses.insert(id, status);
        tracing::debug!(
            file_id = %id,
            old_status = ?old_status,
            new_status = ?status,
            "Status changed"
        );
    }

    fn get_status(&self, id: &FileId) -> Option<ProcessingStatus> {
        self.statuses.get(id).map(|s| *s)
    }

    fn store_result(&self, id: FileId, payload: Vec<u8>) {
        self.results.insert(id, ProcessedResult::ready(payload));
        self.statuses.insert(id, ProcessingStatus::Ready);
    }

    fn store_error(&self, id: FileId, message: String) {
        self.results.insert(id, ProcessedResult::error(message));
        self.statuses.insert(id, ProcessingStatus::Error);
    }

    fn get_result(&self, id: &FileId) -> Option<ProcessedResult> {
        self.results.get(id).map(|r| r.clone())
    }

    fn list_ids(&self) -> Vec<FileId> {
        self.statuses.iter().map(|entry| *entry.key()).collect()
    }
}
