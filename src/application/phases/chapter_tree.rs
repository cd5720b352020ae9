//! Chapter Tree Builder - 故事文档到章节树
//!
//! 映射规则:
//! - `Content` -> 文本叶子
//! - `Link` -> 图片叶子
//! - `CharacterStyleRange` 只有一个叶子子节点时把样式挂到该叶子上，否则包成段落容器
//! - `ParagraphStyleRange` -> 段落容器
//! - 其他元素：单个子节点直接上提，多个子节点包成无样式段落，没有子节点则消失

use async_trait::async_trait;

use super::story_schema::{
    descriptor_from_link, top_level_stories, CHARACTER_RANGE, CHARACTER_STYLE_ATTR, CONTENT, LINK,
    PARAGRAPH_RANGE, PARAGRAPH_STYLE_ATTR,
};
use crate::application::ports::{Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::ChapterNode;
use crate::domain::package::XmlElement;
use crate::domain::processing::ProcessingContext;

/// 每个顶层故事生成一个 Story 节点（文档顺序）
pub fn build_chapter_tree(documents: &[XmlElement]) -> Vec<ChapterNode> {
    documents
        .iter()
        .flat_map(top_level_stories)
        .map(|story| ChapterNode::story(build_children(story)))
        .collect()
}

fn build_children(element: &XmlElement) -> Vec<ChapterNode> {
    element.child_elements().filter_map(build_node).collect()
}

fn build_node(element: &XmlElement) -> Option<ChapterNode> {
    match element.name.as_str() {
        CONTENT => Some(ChapterNode::text(element.text_content())),
        LINK => Some(ChapterNode::image(&descriptor_from_link(element))),
        CHARACTER_RANGE => {
            let style = element.attr(CHARACTER_STYLE_ATTR).map(str::to_string);
            let mut children = build_children(element);
            if children.len() == 1 && children[0].is_leaf() {
                children.pop().map(|leaf| leaf.with_style(style))
            } else {
                Some(ChapterNode::paragraph(style, children))
            }
        }
        PARAGRAPH_RANGE => {
            let style = element.attr(PARAGRAPH_STYLE_ATTR).map(str::to_string);
            Some(ChapterNode::paragraph(style, build_children(element)))
        }
        _ => {
            let mut children = build_children(element);
            match children.len() {
                0 => None,
                1 => children.pop(),
                _ => Some(ChapterNode::paragraph(None, children)),
            }
        }
    }
}

/// 阶段二：章节树构建
pub struct ChapterTreePhase;

#[async_trait]
impl PipelinePhase for ChapterTreePhase {
    fn phase(&self) -> Phase {
        Phase::ChapterTree
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        context.chapter_tree = build_chapter_tree(&context.story_documents);
        tracing::debug!(
            file_id = %context.file_id,
            stories = context.chapter_tree.len(),
            "Chapter tree built"
        );
        PhaseOutcome::proceed(context)
    }
}
