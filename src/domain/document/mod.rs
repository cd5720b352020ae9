//! Document Context - 文档内容模型
//!
//! 职责:
//! - 章节树（封闭的节点变体）
//! - 图片描述符扁平列表
//! - 评审接口的出现序号寻址

mod chapter;
mod errors;
mod image;
mod occurrences;

pub use chapter::{count_nodes, walk_tree, walk_tree_mut, ChapterNode};
pub use errors::DocumentError;
pub use image::{is_blank, ImageDescriptor};
pub use occurrences::{
    image_leaves_mut, image_occurrence_mut, image_occurrences, lang_markup_leaves_mut,
    lang_markup_occurrence_mut, lang_markup_occurrences, ImageOccurrence, LangMarkupOccurrence,
};
