//! Review Command Handlers - 评审决定
//!
//! 编辑先作用在待评审上下文的副本上；全部成功后才从存储中取出并重新提交。
//! 任何一步校验失败时上下文原样留在存储中。

use std::sync::Arc;

use crate::application::commands::publish_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    Phase, PendingReviewStorePort, PipelineError, PipelineRunnerPort, ResultStorePort,
};
use crate::domain::document::{image_leaves_mut, lang_markup_leaves_mut, ChapterNode};
use crate::domain::processing::{metadata_keys, FileId, ProcessingContext, ReviewKind};

/// 某一种评审的存储与重新提交
struct ReviewGate {
    kind: ReviewKind,
    pending: Arc<dyn PendingReviewStorePort>,
    results: Arc<dyn ResultStorePort>,
    runner: Arc<dyn PipelineRunnerPort>,
}

impl ReviewGate {
    fn new(
        kind: ReviewKind,
        pending: Arc<dyn PendingReviewStorePort>,
        results: Arc<dyn ResultStorePort>,
        runner: Arc<dyn PipelineRunnerPort>,
    ) -> Self {
        Self {
            kind,
            pending,
            results,
            runner,
        }
    }

    /// 待评审上下文的副本
    fn checkout(&self, id: FileId) -> Result<ProcessingContext, ApplicationError> {
        match self.pending.get(&id) {
            Some(context) => Ok(context),
            None if self.results.get_status(&id).is_some() => {
                Err(ApplicationError::not_pending(id, self.kind))
            }
            None => Err(ApplicationError::NotFound(id)),
        }
    }

    async fn resume(&self, mut context: ProcessingContext) -> Result<ResumeResponse, ApplicationError> {
        if !self.runner.is_accepting() {
            return Err(PipelineError::ShuttingDown.into());
        }

        let file_id = context.file_id;
        // 期间被其他请求取走
        let Some(parked) = self.pending.remove(&file_id) else {
            return Err(ApplicationError::not_pending(file_id, self.kind));
        };
        context.review = None;

        let phase = Phase::resume_after(self.kind);
        if let Err(err) = self.runner.resubmit(context, phase).await {
            // 重新提交失败：原上下文放回，状态仍为等待评审
            self.pending.store(parked);
            tracing::warn!(
                file_id = %file_id,
                review = self.kind.as_str(),
                error = %err,
                "Resubmit failed, context kept parked"
            );
            return Err(err.into());
        }
        tracing::info!(
            file_id = %file_id,
            review = self.kind.as_str(),
            phase = %phase,
            "Review approved, pipeline resumed"
        );

        Ok(ResumeResponse {
            file_id,
            resumed_at: phase.as_str(),
        })
    }
}

/// ProvideMetadata Handler
pub struct ProvideMetadataHandler {
    gate: ReviewGate,
}

impl ProvideMetadataHandler {
    pub fn new(
        pending: Arc<dyn PendingReviewStorePort>,
        results: Arc<dyn ResultStorePort>,
        runner: Arc<dyn PipelineRunnerPort>,
    ) -> Self {
        Self {
            gate: ReviewGate::new(ReviewKind::Metadata, pending, results, runner),
        }
    }

    pub async fn handle(&self, cmd: ProvideMetadata) -> Result<ResumeResponse, ApplicationError> {
        let mut context = self.gate.checkout(cmd.file_id)?;

        for (key, value) in cmd.metadata {
            if key.starts_with(metadata_keys::BOOKKEEPING_PREFIX) {
                return Err(ApplicationError::validation(format!(
                    "metadata key '{}' is reserved",
                    key
                )));
            }
            context.set_metadata(key, value);
        }
        for (filename, bytes) in cmd.images {
            if bytes.is_empty() {
                return Err(ApplicationError::validation(format!(
                    "image '{}' is empty",
                    filename
                )));
            }
            context.image_contents.insert(filename, bytes);
        }

        // 门禁会重新检查，仍不完整时再次暂停
        self.gate.resume(context).await
    }
}

/// ApproveAltTexts Handler
pub struct ApproveAltTextsHandler {
    gate: ReviewGate,
}

impl ApproveAltTextsHandler {
    pub fn new(
        pending: Arc<dyn PendingReviewStorePort>,
        results: Arc<dyn ResultStorePort>,
        runner: Arc<dyn PipelineRunnerPort>,
    ) -> Self {
        Self {
            gate: ReviewGate::new(ReviewKind::AltTexts, pending, results, runner),
        }
    }

    pub async fn handle(&self, cmd: ApproveAltTexts) -> Result<ResumeResponse, ApplicationError> {
        let mut context = self.gate.checkout(cmd.file_id)?;
        apply_alt_text_edits(&mut context, &cmd.edits)?;
        context.set_flag(metadata_keys::ALT_TEXTS_APPROVED);
        self.gate.resume(context).await
    }
}

/// 第 i 项编辑同时作用于第 i 个图片叶子与扁平列表第 i 项
pub fn apply_alt_text_edits(
    context: &mut ProcessingContext,
    edits: &[AltTextEdit],
) -> Result<(), ApplicationError> {
    let mut leaves = image_leaves_mut(&mut context.chapter_tree);
    let available = leaves.len();
    if let Some((index, _)) = edits.iter().find(|(index, _)| *index >= available) {
        return Err(ApplicationError::invalid_occurrence(*index, available));
    }

    for (index, text) in edits {
        if let ChapterNode::Image { alt_text, .. } = &mut *leaves[*index] {
            *alt_text = Some(text.clone());
        }
        if let Some(image) = context.images.get_mut(*index) {
            image.alt_text = Some(text.clone());
        }
    }
    Ok(())
}

/// ApproveLangMarkup Handler
pub struct ApproveLangMarkupHandler {
    gate: ReviewGate,
}

impl ApproveLangMarkupHandler {
    pub fn new(
        pending: Arc<dyn PendingReviewStorePort>,
        results: Arc<dyn ResultStorePort>,
        runner: Arc<dyn PipelineRunnerPort>,
    ) -> Self {
        Self {
            gate: ReviewGate::new(ReviewKind::LangMarkup, pending, results, runner),
        }
    }

    pub async fn handle(&self, cmd: ApproveLangMarkup) -> Result<ResumeResponse, ApplicationError> {
        let mut context = self.gate.checkout(cmd.file_id)?;
        apply_lang_markup_edits(&mut context.chapter_tree, &cmd.edits)?;
        context.set_flag(metadata_keys::LANG_MARKUP_APPROVED);
        self.gate.resume(context).await
    }
}

/// 序号按编辑前的树计算
pub fn apply_lang_markup_edits(
    tree: &mut [ChapterNode],
    edits: &[LangMarkupEdit],
) -> Result<(), ApplicationError> {
    let mut leaves = lang_markup_leaves_mut(tree);
    let available = leaves.len();
    if let Some((index, _)) = edits.iter().find(|(index, _)| *index >= available) {
        return Err(ApplicationError::invalid_occurrence(*index, available));
    }
    if let Some((_, Some(code))) = edits
        .iter()
        .find(|(_, code)| code.as_deref().is_some_and(|c| c.trim().is_empty()))
    {
        return Err(ApplicationError::validation(format!(
            "invalid language code '{}'",
            code
        )));
    }

    for (index, code) in edits {
        if let ChapterNode::CharacterRange { language, .. } = &mut *leaves[*index] {
            *language = code.as_ref().map(|c| c.trim().to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{image_occurrences, lang_markup_occurrences, ImageDescriptor};
    use crate::domain::processing::{ProcessingStatus, ReviewDetails, UploadSeed};
    use crate::infrastructure::memory::{InMemoryPendingReviewStore, InMemoryResultStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// 记录重新提交的目标阶段
    struct RecordingRunner {
        accepting: AtomicBool,
        /// 模拟入队失败（例如关闭途中队列已关）
        fail_resubmit: AtomicBool,
        resubmitted: Mutex<Vec<(FileId, Phase, ProcessingContext)>>,
    }

    impl RecordingRunner {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                accepting: AtomicBool::new(true),
                fail_resubmit: AtomicBool::new(false),
                resubmitted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PipelineRunnerPort for RecordingRunner {
        async fn submit(&self, context: ProcessingContext) -> Result<FileId, PipelineError> {
            Ok(context.file_id)
        }

        async fn resubmit(
            &self,
            context: ProcessingContext,
            phase: Phase,
        ) -> Result<(), PipelineError> {
            if self.fail_resubmit.load(Ordering::SeqCst) {
                return Err(PipelineError::ShuttingDown);
            }
            self.resubmitted
                .lock()
                .unwrap()
                .push((context.file_id, phase, context));
            Ok(())
        }

        fn is_accepting(&self) -> bool {
            self.accepting.load(Ordering::SeqCst)
        }
    }

    struct Fixture {
        pending: Arc<InMemoryPendingReviewStore>,
        results: Arc<InMemoryResultStore>,
        runner: Arc<RecordingRunner>,
    }

    impl Fixture {
        fn new(kind: ReviewKind) -> Self {
            Self {
                pending: Arc::new(InMemoryPendingReviewStore::new(kind)),
                results: Arc::new(InMemoryResultStore::new()),
                runner: RecordingRunner::new(),
            }
        }

        fn park(&self, context: ProcessingContext, kind: ReviewKind) -> FileId {
            let id = context.file_id;
            self.results.set_status(id, kind.awaiting_status());
            self.pending.store(context);
            id
        }
    }

    fn descriptor(filename: &str) -> ImageDescriptor {
        ImageDescriptor::new(
            format!("Links/{}", filename),
            filename.to_string(),
            "png".to_string(),
        )
    }

    fn context_with_images() -> ProcessingContext {
        let mut ctx = ProcessingContext::new(UploadSeed {
            original_filename: "book.idml".to_string(),
            content_type: "application/zip".to_string(),
            bytes: vec![1],
        });
        ctx.images = vec![descriptor("a.png"), descriptor("b.png"), descriptor("a.png")];
        ctx.chapter_tree = vec![ChapterNode::story(
            ctx.images.iter().map(ChapterNode::image).collect(),
        )];
        ctx
    }

    fn tagged(text: &str) -> ChapterNode {
        ChapterNode::CharacterRange {
            style: None,
            text: text.to_string(),
            language: Some("und".to_string()),
        }
    }

    #[tokio::test]
    async fn test_alt_text_edits_resume_into_lang_markup() {
        let fx = Fixture::new(ReviewKind::AltTexts);
        let id = fx.park(context_with_images(), ReviewKind::AltTexts);
        let handler =
            ApproveAltTextsHandler::new(fx.pending.clone(), fx.results.clone(), fx.runner.clone());

        let response = handler
            .handle(ApproveAltTexts {
                file_id: id,
                edits: vec![(2, "Second apple".to_string())],
            })
            .await
            .unwrap();

        assert_eq!(response.resumed_at, "lang_markup");
        assert!(!fx.pending.contains(&id));
        let resubmitted = fx.runner.resubmitted.lock().unwrap();
        let (_, phase, ctx) = &resubmitted[0];
        assert_eq!(*phase, Phase::LangMarkup);
        assert!(ctx.has_flag(metadata_keys::ALT_TEXTS_APPROVED));
        let occurrences = image_occurrences(&ctx.chapter_tree);
        assert_eq!(occurrences[0].alt_text, None);
        assert_eq!(occurrences[2].alt_text.as_deref(), Some("Second apple"));
        assert_eq!(ctx.images[2].alt_text.as_deref(), Some("Second apple"));
        assert_eq!(ctx.images[0].alt_text, None);
    }

    #[tokio::test]
    async fn test_out_of_range_edit_keeps_context_parked() {
        let fx = Fixture::new(ReviewKind::AltTexts);
        let original = context_with_images();
        let id = fx.park(original.clone(), ReviewKind::AltTexts);
        let handler =
            ApproveAltTextsHandler::new(fx.pending.clone(), fx.results.clone(), fx.runner.clone());

        let err = handler
            .handle(ApproveAltTexts {
                file_id: id,
                edits: vec![(0, "ok".to_string()), (3, "too far".to_string())],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::InvalidOccurrence {
                index: 3,
                available: 3
            }
        ));
        assert_eq!(fx.pending.get(&id), Some(original));
        assert!(fx.runner.resubmitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_not_pending_ids() {
        let fx = Fixture::new(ReviewKind::AltTexts);
        let handler =
            ApproveAltTextsHandler::new(fx.pending.clone(), fx.results.clone(), fx.runner.clone());

        let unknown = FileId::new();
        let err = handler
            .handle(ApproveAltTexts {
                file_id: unknown,
                edits: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(id) if id == unknown));

        let running = FileId::new();
        fx.results.set_status(running, ProcessingStatus::InProgress);
        let err = handler
            .handle(ApproveAltTexts {
                file_id: running,
                edits: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotPending { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_approval() {
        let fx = Fixture::new(ReviewKind::AltTexts);
        let id = fx.park(context_with_images(), ReviewKind::AltTexts);
        fx.runner.accepting.store(false, Ordering::SeqCst);
        let handler =
            ApproveAltTextsHandler::new(fx.pending.clone(), fx.results.clone(), fx.runner.clone());

        let err = handler
            .handle(ApproveAltTexts {
                file_id: id,
                edits: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Pipeline(PipelineError::ShuttingDown)
        ));
        assert!(fx.pending.contains(&id));
    }

    #[tokio::test]
    async fn test_failed_resubmit_keeps_context_parked() {
        let fx = Fixture::new(ReviewKind::LangMarkup);
        let mut ctx = context_with_images();
        ctx.chapter_tree = vec![ChapterNode::story(vec![tagged("Hello")])];
        ctx.review = Some(ReviewDetails::LangMarkup { flagged: 1 });
        let original = ctx.clone();
        let id = fx.park(ctx, ReviewKind::LangMarkup);
        fx.runner.fail_resubmit.store(true, Ordering::SeqCst);
        let handler = ApproveLangMarkupHandler::new(
            fx.pending.clone(),
            fx.results.clone(),
            fx.runner.clone(),
        );

        let err = handler
            .handle(ApproveLangMarkup {
                file_id: id,
                edits: vec![(0, Some("en".to_string()))],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::Pipeline(PipelineError::ShuttingDown)
        ));
        let parked = fx.pending.get(&id).expect("context still parked");
        assert_eq!(parked, original);
        assert_eq!(parked.review, Some(ReviewDetails::LangMarkup { flagged: 1 }));
        assert_eq!(
            fx.results.get_status(&id),
            Some(ProcessingStatus::AwaitingLangMarkupReview)
        );
        assert!(fx.runner.resubmitted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lang_edits_use_indices_before_edit() {
        let mut tree = vec![ChapterNode::story(vec![
            tagged("one"),
            ChapterNode::text("plain"),
            tagged("two"),
            tagged("three"),
        ])];

        apply_lang_markup_edits(&mut tree, &[(0, None), (1, Some("en".to_string())), (2, Some(" sv ".to_string()))])
            .unwrap();

        let occurrences = lang_markup_occurrences(&tree);
        let tags: Vec<_> = occurrences
            .iter()
            .map(|o| (o.text.as_str(), o.language.as_str()))
            .collect();
        assert_eq!(tags, vec![("two", "en"), ("three", "sv")]);
    }

    #[test]
    fn test_blank_language_code_rejected() {
        let mut tree = vec![ChapterNode::story(vec![tagged("one")])];
        let before = tree.clone();
        assert!(matches!(
            apply_lang_markup_edits(&mut tree, &[(0, Some("  ".to_string()))]),
            Err(ApplicationError::ValidationError(_))
        ));
        assert_eq!(tree, before);
    }

    #[tokio::test]
    async fn test_lang_approval_resumes_into_render() {
        let fx = Fixture::new(ReviewKind::LangMarkup);
        let mut ctx = context_with_images();
        ctx.chapter_tree = vec![ChapterNode::story(vec![tagged("Hello")])];
        let id = fx.park(ctx, ReviewKind::LangMarkup);
        let handler = ApproveLangMarkupHandler::new(
            fx.pending.clone(),
            fx.results.clone(),
            fx.runner.clone(),
        );

        handler
            .handle(ApproveLangMarkup {
                file_id: id,
                edits: vec![(0, Some("en".to_string()))],
            })
            .await
            .unwrap();

        let resubmitted = fx.runner.resubmitted.lock().unwrap();
        let (_, phase, ctx) = &resubmitted[0];
        assert_eq!(*phase, Phase::XhtmlRender);
        assert!(ctx.has_flag(metadata_keys::LANG_MARKUP_APPROVED));
        assert_eq!(lang_markup_occurrences(&ctx.chapter_tree)[0].language, "en");
    }

    #[tokio::test]
    async fn test_metadata_resumes_into_gate_and_rejects_reserved_keys() {
        let fx = Fixture::new(ReviewKind::Metadata);
        let id = fx.park(context_with_images(), ReviewKind::Metadata);
        let handler =
            ProvideMetadataHandler::new(fx.pending.clone(), fx.results.clone(), fx.runner.clone());

        let mut reserved = ProvideMetadata {
            file_id: id,
            ..Default::default()
        };
        reserved
            .metadata
            .insert(metadata_keys::ALT_TEXTS_APPROVED.to_string(), "true".to_string());
        assert!(handler.handle(reserved).await.is_err());
        assert!(fx.pending.contains(&id));

        let mut cmd = ProvideMetadata {
            file_id: id,
            ..Default::default()
        };
        cmd.metadata
            .insert(metadata_keys::TITLE.to_string(), "Kirja".to_string());
        cmd.images.insert("a.png".to_string(), vec![1, 2]);
        let response = handler.handle(cmd).await.unwrap();

        assert_eq!(response.resumed_at, "metadata_gate");
        let resubmitted = fx.runner.resubmitted.lock().unwrap();
        let (_, phase, ctx) = &resubmitted[0];
        assert_eq!(*phase, Phase::MetadataGate);
        assert_eq!(ctx.metadata_value(metadata_keys::TITLE), Some("Kirja"));
        assert!(ctx.has_image_content("a.png"));
    }
}
