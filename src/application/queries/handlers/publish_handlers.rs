//! Publish Query Handlers
//!
//! 出现序号每次都从当前树重新计算

use std::sync::Arc;

use serde::Serialize;

use crate::application::error::ApplicationError;
use crate::application::ports::{PendingReviewStores, ResultStorePort};
use crate::application::queries::*;
use crate::domain::document::{
    image_occurrences, lang_markup_occurrences, ImageOccurrence, LangMarkupOccurrence,
};
use crate::domain::processing::{
    FileId, ProcessedResult, ProcessingContext, ProcessingStatus, ReviewDetails, ReviewKind,
};

// ============================================================================
// Response DTOs
// ============================================================================

/// 暂停细节响应
#[derive(Debug, Clone, Serialize)]
pub struct PendingDetailsResponse {
    pub file_id: FileId,
    pub status: ProcessingStatus,
    pub kind: ReviewKind,
    pub details: Option<ReviewDetails>,
    /// 当前元数据（不含记账键）
    pub metadata: Vec<(String, String)>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetStatus Handler
pub struct GetStatusHandler {
    results: Arc<dyn ResultStorePort>,
}

impl GetStatusHandler {
    pub fn new(results: Arc<dyn ResultStorePort>) -> Self {
        Self { results }
    }

    pub fn handle(&self, query: GetStatus) -> Result<ProcessingStatus, ApplicationError> {
        self.results
            .get_status(&query.file_id)
            .ok_or(ApplicationError::NotFound(query.file_id))
    }
}

/// GetResult Handler
///
/// 尚未进入终态时返回 None
pub struct GetResultHandler {
    results: Arc<dyn ResultStorePort>,
}

impl GetResultHandler {
    pub fn new(results: Arc<dyn ResultStorePort>) -> Self {
        Self { results }
    }

    pub fn handle(&self, query: GetResult) -> Result<Option<ProcessedResult>, ApplicationError> {
        if self.results.get_status(&query.file_id).is_none() {
            return Err(ApplicationError::NotFound(query.file_id));
        }
        Ok(self.results.get_result(&query.file_id))
    }
}

/// ListPending Handler
pub struct ListPendingHandler {
    stores: PendingReviewStores,
}

impl ListPendingHandler {
    pub fn new(stores: PendingReviewStores) -> Self {
        Self { stores }
    }

    pub fn handle(&self, query: ListPending) -> Vec<FileId> {
        let mut ids = self.stores.for_kind(query.kind).list_ids();
        ids.sort();
        ids
    }
}

/// 取出指定评审中的上下文副本
fn pending_context(
    stores: &PendingReviewStores,
    results: &dyn ResultStorePort,
    kind: ReviewKind,
    id: FileId,
) -> Result<ProcessingContext, ApplicationError> {
    match stores.for_kind(kind).get(&id) {
        Some(context) => Ok(context),
        None if results.get_status(&id).is_some() => Err(ApplicationError::not_pending(id, kind)),
        None => Err(ApplicationError::NotFound(id)),
    }
}

/// ListImageOccurrences Handler
pub struct ListImageOccurrencesHandler {
    stores: PendingReviewStores,
    results: Arc<dyn ResultStorePort>,
}

impl ListImageOccurrencesHandler {
    pub fn new(stores: PendingReviewStores, results: Arc<dyn ResultStorePort>) -> Self {
        Self { stores, results }
    }

    pub fn handle(
        &self,
        query: ListImageOccurrences,
    ) -> Result<Vec<ImageOccurrence>, ApplicationError> {
        let context = pending_context(
            &self.stores,
            self.results.as_ref(),
            ReviewKind::AltTexts,
            query.file_id,
        )?;
        Ok(image_occurrences(&context.chapter_tree))
    }
}

/// ListLangMarkupOccurrences Handler
pub struct ListLangMarkupOccurrencesHandler {
    stores: PendingReviewStores,
    results: Arc<dyn ResultStorePort>,
}

impl ListLangMarkupOccurrencesHandler {
    pub fn new(stores: PendingReviewStores, results: Arc<dyn ResultStorePort>) -> Self {
        Self { stores, results }
    }

    pub fn handle(
        &self,
        query: ListLangMarkupOccurrences,
    ) -> Result<Vec<LangMarkupOccurrence>, ApplicationError> {
        let context = pending_context(
            &self.stores,
            self.results.as_ref(),
            ReviewKind::LangMarkup,
            query.file_id,
        )?;
        Ok(lang_markup_occurrences(&context.chapter_tree))
    }
}

/// GetPendingDetails Handler
pub struct GetPendingDetailsHandler {
    stores: PendingReviewStores,
    results: Arc<dyn ResultStorePort>,
}

impl GetPendingDetailsHandler {
    pub fn new(stores: PendingReviewStores, results: Arc<dyn ResultStorePort>) -> Self {
        Self { stores, results }
    }

    pub fn handle(
        &self,
        query: GetPendingDetails,
    ) -> Result<PendingDetailsResponse, ApplicationError> {
        let id = query.file_id;
        let status = self
            .results
            .get_status(&id)
            .ok_or(ApplicationError::NotFound(id))?;

        let kind = self.stores.locate(&id).ok_or_else(|| {
            ApplicationError::invalid_state(format!(
                "file {} is not awaiting review (status: {})",
                id,
                status.as_str()
            ))
        })?;
        let context = pending_context(&self.stores, self.results.as_ref(), kind, id)?;

        Ok(PendingDetailsResponse {
            file_id: id,
            status,
            kind,
            metadata: context
                .publication_metadata()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            details: context.review,
        })
    }
}
