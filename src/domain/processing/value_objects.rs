//! Processing Context - Value Objects

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// 上传文件唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Dublin Core 元数据键
pub mod metadata_keys {
    pub const TITLE: &str = "title";
    pub const CREATOR: &str = "creator";
    pub const PUBLISHER: &str = "publisher";
    pub const LANGUAGE: &str = "language";
    pub const IDENTIFIER: &str = "identifier";

    /// 必填字段，顺序即报告顺序
    pub const REQUIRED: [&str; 5] = [TITLE, CREATOR, PUBLISHER, LANGUAGE, IDENTIFIER];

    /// 流水线内部记账键前缀，不会写入 EPUB
    pub const BOOKKEEPING_PREFIX: char = '_';

    pub const ALT_TEXTS_APPROVED: &str = "_alt_texts_approved";
    pub const LANG_MARKUP_APPROVED: &str = "_lang_markup_approved";
}
