//! Occurrence Addressing - 评审接口使用的出现序号
//!
//! 图片与语言标记的出现序号均为 0..n-1，按当前树的深度优先、文档顺序计算。
//! 每次读取都重新计算，只在下一次树变更之前有效。

use serde::Serialize;

use super::chapter::{walk_tree, ChapterNode};

/// 图片出现项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageOccurrence {
    pub index: usize,
    pub filename: String,
    pub resource_uri: String,
    pub alt_text: Option<String>,
}

/// 语言标记出现项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LangMarkupOccurrence {
    pub index: usize,
    pub text: String,
    pub language: String,
    pub style: Option<String>,
}

fn is_image(node: &ChapterNode) -> bool {
    matches!(node, ChapterNode::Image { .. })
}

fn is_lang_tagged(node: &ChapterNode) -> bool {
    matches!(
        node,
        ChapterNode::CharacterRange {
            language: Some(_),
            ..
        }
    )
}

pub fn image_occurrences(tree: &[ChapterNode]) -> Vec<ImageOccurrence> {
    let mut out = Vec::new();
    walk_tree(tree, |node| {
        if let ChapterNode::Image {
            resource_uri,
            filename,
            alt_text,
            ..
        } = node
        {
            out.push(ImageOccurrence {
                index: out.len(),
                filename: filename.clone(),
                resource_uri: resource_uri.clone(),
                alt_text: alt_text.clone(),
            });
        }
    });
    out
}

pub fn lang_markup_occurrences(tree: &[ChapterNode]) -> Vec<LangMarkupOccurrence> {
    let mut out = Vec::new();
    walk_tree(tree, |node| {
        if let ChapterNode::CharacterRange {
            style,
            text,
            language: Some(language),
        } = node
        {
            out.push(LangMarkupOccurrence {
                index: out.len(),
                text: text.clone(),
                language: language.clone(),
                style: style.clone(),
            });
        }
    });
    out
}

fn collect_leaves_mut<'a>(
    nodes: &'a mut [ChapterNode],
    matches: fn(&ChapterNode) -> bool,
    out: &mut Vec<&'a mut ChapterNode>,
) {
    for node in nodes.iter_mut() {
        if matches(node) {
            out.push(node);
            continue;
        }
        if let ChapterNode::Story { children, .. } | ChapterNode::ParagraphRange { children, .. } =
            node
        {
            collect_leaves_mut(children, matches, out);
        }
    }
}

/// 全部图片叶子，下标即出现序号
pub fn image_leaves_mut(tree: &mut [ChapterNode]) -> Vec<&mut ChapterNode> {
    let mut leaves = Vec::new();
    collect_leaves_mut(tree, is_image, &mut leaves);
    leaves
}

/// 全部带语言标记的文本叶子
///
/// 一次性取出，批量修改时不会因为移除标记而改变其余叶子的序号
pub fn lang_markup_leaves_mut(tree: &mut [ChapterNode]) -> Vec<&mut ChapterNode> {
    let mut leaves = Vec::new();
    collect_leaves_mut(tree, is_lang_tagged, &mut leaves);
    leaves
}

/// 按出现序号定位图片叶子
pub fn image_occurrence_mut(tree: &mut [ChapterNode], index: usize) -> Option<&mut ChapterNode> {
    image_leaves_mut(tree).into_iter().nth(index)
}

/// 按出现序号定位带语言标记的文本叶子
pub fn lang_markup_occurrence_mut(
    tree: &mut [ChapterNode],
    index: usize,
) -> Option<&mut ChapterNode> {
    lang_markup_leaves_mut(tree).into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(text: &str, language: &str) -> ChapterNode {
        ChapterNode::CharacterRange {
            style: None,
            text: text.to_string(),
            language: Some(language.to_string()),
        }
    }

    fn image(filename: &str) -> ChapterNode {
        ChapterNode::Image {
            style: None,
            resource_uri: format!("Links/{}", filename),
            filename: filename.to_string(),
            format: "png".to_string(),
            alt_text: None,
        }
    }

    #[test]
    fn test_occurrences_follow_document_order() {
        let tree = vec![
            ChapterNode::story(vec![
                ChapterNode::paragraph(None, vec![image("a.png"), tagged("hello", "und")]),
                image("b.png"),
            ]),
            ChapterNode::story(vec![tagged("world", "en"), image("a.png")]),
        ];

        let images = image_occurrences(&tree);
        let names: Vec<&str> = images.iter().map(|o| o.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "a.png"]);
        assert_eq!(images[2].index, 2);

        let marks = lang_markup_occurrences(&tree);
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[1].text, "world");
        assert_eq!(marks[1].language, "en");
    }

    #[test]
    fn test_occurrence_mut_addresses_same_index() {
        let mut tree = vec![ChapterNode::story(vec![
            image("a.png"),
            ChapterNode::paragraph(None, vec![image("b.png")]),
        ])];

        if let Some(ChapterNode::Image { alt_text, .. }) = image_occurrence_mut(&mut tree, 1) {
            *alt_text = Some("second".to_string());
        } else {
            panic!("occurrence 1 not found");
        }

        let images = image_occurrences(&tree);
        assert_eq!(images[0].alt_text, None);
        assert_eq!(images[1].alt_text.as_deref(), Some("second"));
        assert!(image_occurrence_mut(&mut tree, 2).is_none());
        assert!(lang_markup_occurrence_mut(&mut tree, 0).is_none());
    }
}
