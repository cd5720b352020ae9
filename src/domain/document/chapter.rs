//! Document Context - Chapter Tree
//!
//! 章节树：封闭的四种节点变体，顺序承载语义（渲染编号与评审索引）

use serde::{Deserialize, Serialize};

use super::image::ImageDescriptor;

/// 章节树节点
///
/// 不变量:
/// - 叶子节点（CharacterRange / Image）没有子节点
/// - 容器节点的 children 保持源文档顺序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterNode {
    /// 一个 Story 的根容器
    Story {
        style: Option<String>,
        children: Vec<ChapterNode>,
    },
    /// 段落级容器
    ParagraphRange {
        style: Option<String>,
        children: Vec<ChapterNode>,
    },
    /// 文本叶子
    CharacterRange {
        style: Option<String>,
        text: String,
        language: Option<String>,
    },
    /// 图片叶子
    Image {
        style: Option<String>,
        resource_uri: String,
        filename: String,
        format: String,
        alt_text: Option<String>,
    },
}

impl ChapterNode {
    pub fn story(children: Vec<ChapterNode>) -> Self {
        ChapterNode::Story {
            style: None,
            children,
        }
    }

    pub fn paragraph(style: Option<String>, children: Vec<ChapterNode>) -> Self {
        ChapterNode::ParagraphRange { style, children }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ChapterNode::CharacterRange {
            style: None,
            text: text.into(),
            language: None,
        }
    }

    pub fn image(descriptor: &ImageDescriptor) -> Self {
        ChapterNode::Image {
            style: None,
            resource_uri: descriptor.resource_uri.clone(),
            filename: descriptor.filename.clone(),
            format: descriptor.format.clone(),
            alt_text: descriptor.alt_text.clone(),
        }
    }

    pub fn style(&self) -> Option<&str> {
        match self {
            ChapterNode::Story { style, .. }
            | ChapterNode::ParagraphRange { style, .. }
            | ChapterNode::CharacterRange { style, .. }
            | ChapterNode::Image { style, .. } => style.as_deref(),
        }
    }

    pub fn style_mut(&mut self) -> &mut Option<String> {
        match self {
            ChapterNode::Story { style, .. }
            | ChapterNode::ParagraphRange { style, .. }
            | ChapterNode::CharacterRange { style, .. }
            | ChapterNode::Image { style, .. } => style,
        }
    }

    /// 替换样式，返回自身便于链式构造
    pub fn with_style(mut self, new_style: Option<String>) -> Self {
        *self.style_mut() = new_style;
        self
    }

    pub fn children(&self) -> &[ChapterNode] {
        match self {
            ChapterNode::Story { children, .. } | ChapterNode::ParagraphRange { children, .. } => {
                children
            }
            ChapterNode::CharacterRange { .. } | ChapterNode::Image { .. } => &[],
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ChapterNode::Story { .. } | ChapterNode::ParagraphRange { .. }
        )
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_container()
    }

    /// 前序遍历（文档顺序）
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a ChapterNode),
    {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// 子树所有文本叶子的拼接
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| {
            if let ChapterNode::CharacterRange { text, .. } = node {
                out.push_str(text);
            }
        });
        out
    }
}

/// 对整棵树做前序遍历
pub fn walk_tree<'a, F>(tree: &'a [ChapterNode], mut visit: F)
where
    F: FnMut(&'a ChapterNode),
{
    for node in tree {
        node.walk(&mut visit);
    }
}

/// 前序遍历中的节点总数（渲染编号的上界）
pub fn count_nodes(tree: &[ChapterNode]) -> usize {
    let mut count = 0;
    walk_tree(tree, |_| count += 1);
    count
}

/// 可变前序遍历，visit 在进入子节点前调用
pub fn walk_tree_mut<F>(tree: &mut [ChapterNode], visit: &mut F)
where
    F: FnMut(&mut ChapterNode),
{
    for node in tree.iter_mut() {
        visit(node);
        match node {
            ChapterNode::Story { children, .. } | ChapterNode::ParagraphRange { children, .. } => {
                walk_tree_mut(children, visit)
            }
            ChapterNode::CharacterRange { .. } | ChapterNode::Image { .. } => {}
        }
    }
}
