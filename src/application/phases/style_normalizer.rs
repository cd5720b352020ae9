//! Style Normalizer - 样式名只保留最后一段路径

use async_trait::async_trait;

use crate::application::ports::{Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::{walk_tree_mut, ChapterNode};
use crate::domain::processing::ProcessingContext;

/// `ParagraphStyle/Headings/Heading 1` -> `Heading 1`
///
/// 最后一段原样保留（不去空白，空段即空字符串）
fn last_segment(style: &str) -> String {
    style.rsplit('/').next().unwrap_or(style).to_string()
}

/// 原地规范化整棵树的样式，结果是幂等的
pub fn normalize_styles(tree: &mut [ChapterNode]) {
    walk_tree_mut(tree, &mut |node| {
        let style = node.style_mut();
        if let Some(normalized) = style.as_deref().map(last_segment) {
            *style = Some(normalized);
        }
    });
}

/// 阶段四：样式规范化
pub struct StyleNormalizationPhase;

#[async_trait]
impl PipelinePhase for StyleNormalizationPhase {
    fn phase(&self) -> Phase {
        Phase::StyleNormalization
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        normalize_styles(&mut context.chapter_tree);
        PhaseOutcome::proceed(context)
    }
}
