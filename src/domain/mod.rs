//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Document Context: 章节树与图片描述符
//! - Package Context: 排版包读取（zip / XML / URI）
//! - Processing Context: 处理上下文、状态与评审
//!
//! 以及共享的语言片段分割器

pub mod document;
pub mod package;
pub mod processing;

mod language_segmenter;

pub use language_segmenter::{
    find_phrase_ranges, merge_ranges, parse_phrase_list, split_by_phrases, LanguageSegment,
    UNDETERMINED_LANGUAGE,
};
