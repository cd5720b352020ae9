//! Alt Text Proposer - 为缺少替代文本的图片生成候选描述
//!
//! 每个文件名最多请求一次描述服务；已有的替代文本从不覆盖

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::application::ports::{ImageDescriberPort, Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::{is_blank, walk_tree_mut, ChapterNode};
use crate::domain::processing::{metadata_keys, ProcessingContext, ReviewDetails};

/// 一次提议的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltTextProposal {
    pub proposed: Vec<String>,
    pub unresolved: Vec<String>,
}

/// 对扁平列表与章节树同时填充候选描述
pub async fn propose_alt_texts(
    context: &mut ProcessingContext,
    describer: &dyn ImageDescriberPort,
) -> AltTextProposal {
    let mut candidates: Vec<String> = Vec::new();
    for image in &context.images {
        if image.lacks_alt_text()
            && context.has_image_content(&image.filename)
            && !candidates.contains(&image.filename)
        {
            candidates.push(image.filename.clone());
        }
    }

    let mut descriptions: HashMap<String, String> = HashMap::new();
    let mut proposal = AltTextProposal::default();

    for filename in candidates {
        let Some(bytes) = context.image_contents.get(&filename) else {
            continue;
        };
        match describer.describe_image(bytes).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                descriptions.insert(filename.clone(), text.trim().to_string());
                proposal.proposed.push(filename);
            }
            Ok(_) => {
                tracing::warn!(image = %filename, "Describer returned no description");
                proposal.unresolved.push(filename);
            }
            Err(e) => {
                tracing::warn!(image = %filename, error = %e, "Image description failed");
                proposal.unresolved.push(filename);
            }
        }
    }

    if descriptions.is_empty() {
        return proposal;
    }

    for image in context.images.iter_mut() {
        if image.lacks_alt_text() {
            if let Some(text) = descriptions.get(&image.filename) {
                image.alt_text = Some(text.clone());
            }
        }
    }

    walk_tree_mut(&mut context.chapter_tree, &mut |node| {
        if let ChapterNode::Image {
            filename, alt_text, ..
        } = node
        {
            if is_blank(alt_text.as_deref()) {
                if let Some(text) = descriptions.get(filename.as_str()) {
                    *alt_text = Some(text.clone());
                }
            }
        }
    });

    proposal
}

/// 阶段六：替代文本
pub struct AltTextPhase {
    describer: Arc<dyn ImageDescriberPort>,
    review_enabled: bool,
}

impl AltTextPhase {
    pub fn new(describer: Arc<dyn ImageDescriberPort>, review_enabled: bool) -> Self {
        Self {
            describer,
            review_enabled,
        }
    }
}

#[async_trait]
impl PipelinePhase for AltTextPhase {
    fn phase(&self) -> Phase {
        Phase::AltText
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        let proposal = propose_alt_texts(&mut context, self.describer.as_ref()).await;
        tracing::debug!(
            file_id = %context.file_id,
            proposed = proposal.proposed.len(),
            unresolved = proposal.unresolved.len(),
            "Alt texts proposed"
        );

        let needs_review = self.review_enabled
            && !context.images.is_empty()
            && !context.has_flag(metadata_keys::ALT_TEXTS_APPROVED);
        if needs_review {
            let details = ReviewDetails::AltTexts {
                proposed: proposal.proposed,
                unresolved: proposal.unresolved,
            };
            return PhaseOutcome::suspend(context, details);
        }
        PhaseOutcome::proceed(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::phases::test_support::empty_context;
    use crate::application::ports::ProviderError;
    use crate::domain::document::{image_occurrences, ImageDescriptor};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDescriber {
        calls: AtomicUsize,
        reply: Option<&'static str>,
    }

    impl CountingDescriber {
        fn new(reply: Option<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait]
    impl ImageDescriberPort for CountingDescriber {
        async fn describe_image(&self, _image: &[u8]) -> Result<Option<String>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Some(text) => Ok(Some(text.to_string())),
                None => Err(ProviderError::Timeout),
            }
        }
    }

    fn descriptor(filename: &str) -> ImageDescriptor {
        ImageDescriptor::new(
            format!("Links/{}", filename),
            filename.to_string(),
            "png".to_string(),
        )
    }

    fn context_with_images(filenames: &[&str]) -> ProcessingContext {
        let mut ctx = empty_context();
        let descriptors: Vec<_> = filenames.iter().map(|f| descriptor(f)).collect();
        ctx.chapter_tree = vec![ChapterNode::story(
            descriptors.iter().map(ChapterNode::image).collect(),
        )];
        for d in &descriptors {
            ctx.image_contents.insert(d.filename.clone(), vec![1, 2, 3]);
        }
        ctx.images = descriptors;
        ctx
    }

    #[tokio::test]
    async fn test_same_image_described_once() {
        let mut ctx = context_with_images(&["a.png", "a.png"]);
        let describer = CountingDescriber::new(Some("A red apple"));

        let proposal = propose_alt_texts(&mut ctx, &describer).await;

        assert_eq!(describer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(proposal.proposed, vec!["a.png".to_string()]);
        assert!(ctx
            .images
            .iter()
            .all(|i| i.alt_text.as_deref() == Some("A red apple")));
        let occurrences = image_occurrences(&ctx.chapter_tree);
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences
            .iter()
            .all(|o| o.alt_text.as_deref() == Some("A red apple")));
    }

    #[tokio::test]
    async fn test_existing_alt_text_not_overwritten() {
        let mut ctx = context_with_images(&["a.png", "b.png"]);
        ctx.images[0].alt_text = Some("Author's text".to_string());
        if let ChapterNode::Story { children, .. } = &mut ctx.chapter_tree[0] {
            if let ChapterNode::Image { alt_text, .. } = &mut children[0] {
                *alt_text = Some("Author's text".to_string());
            }
        }
        let describer = CountingDescriber::new(Some("generated"));

        propose_alt_texts(&mut ctx, &describer).await;

        assert_eq!(describer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.images[0].alt_text.as_deref(), Some("Author's text"));
        assert_eq!(ctx.images[1].alt_text.as_deref(), Some("generated"));
    }

    #[tokio::test]
    async fn test_images_without_content_are_skipped() {
        let mut ctx = context_with_images(&["a.png"]);
        ctx.image_contents.clear();
        let describer = CountingDescriber::new(Some("x"));
        let proposal = propose_alt_texts(&mut ctx, &describer).await;
        assert_eq!(describer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(proposal, AltTextProposal::default());
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_alt_text_absent() {
        let mut ctx = context_with_images(&["a.png"]);
        let describer = CountingDescriber::new(None);
        let proposal = propose_alt_texts(&mut ctx, &describer).await;
        assert_eq!(proposal.unresolved, vec!["a.png".to_string()]);
        assert!(ctx.images[0].lacks_alt_text());
    }

    #[tokio::test]
    async fn test_phase_suspends_until_approved() {
        let describer: Arc<dyn ImageDescriberPort> =
            Arc::new(CountingDescriber::new(Some("desc")));
        let phase = AltTextPhase::new(describer, true);

        let outcome = phase.run(context_with_images(&["a.png"])).await;
        let mut ctx = match outcome {
            PhaseOutcome::Suspend { context, details } => {
                assert!(matches!(details, ReviewDetails::AltTexts { .. }));
                *context
            }
            other => panic!("unexpected outcome: {:?}", other),
        };

        ctx.set_flag(metadata_keys::ALT_TEXTS_APPROVED);
        assert!(matches!(phase.run(ctx).await, PhaseOutcome::Continue(_)));
    }

    #[tokio::test]
    async fn test_phase_without_images_continues() {
        let describer: Arc<dyn ImageDescriberPort> = Arc::new(CountingDescriber::new(Some("d")));
        let phase = AltTextPhase::new(describer, true);
        assert!(matches!(
            phase.run(empty_context()).await,
            PhaseOutcome::Continue(_)
        ));
    }
}
