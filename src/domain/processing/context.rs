//! Processing Context - 流水线工作单元
//!
//! 任意时刻只由一个 worker 持有；交给下一阶段队列或放入待评审存储时所有权整体转移。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::status::ReviewDetails;
use super::value_objects::{metadata_keys, FileId};
use crate::domain::document::{ChapterNode, ImageDescriptor};
use crate::domain::package::XmlElement;

/// 上传入口提供的种子信息
#[derive(Debug, Clone)]
pub struct UploadSeed {
    pub original_filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 处理上下文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingContext {
    pub file_id: FileId,
    pub original_filename: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    /// 原始排版包字节
    pub raw_bytes: Vec<u8>,
    /// 中间产物：解析后的故事文档，图片目录建立后释放
    pub story_documents: Vec<XmlElement>,
    pub chapter_tree: Vec<ChapterNode>,
    /// 扁平图片列表（文档顺序，每次出现一项）
    pub images: Vec<ImageDescriptor>,
    /// filename -> 图片字节
    pub image_contents: BTreeMap<String, Vec<u8>>,
    pub xhtml: Option<Vec<u8>>,
    pub toc: Option<Vec<u8>>,
    pub epub: Option<Vec<u8>>,
    /// Dublin Core 字段与 `_` 前缀的流水线记账
    pub metadata: BTreeMap<String, String>,
    /// 最近一次暂停的细节
    pub review: Option<ReviewDetails>,
}

impl ProcessingContext {
    pub fn new(seed: UploadSeed) -> Self {
        Self {
            file_id: FileId::new(),
            original_filename: seed.original_filename,
            content_type: seed.content_type,
            size: seed.bytes.len() as u64,
            uploaded_at: Utc::now(),
            raw_bytes: seed.bytes,
            story_documents: Vec::new(),
            chapter_tree: Vec::new(),
            images: Vec::new(),
            image_contents: BTreeMap::new(),
            xhtml: None,
            toc: None,
            epub: None,
            metadata: BTreeMap::new(),
            review: None,
        }
    }

    /// 非空白的元数据值
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn set_flag(&mut self, key: &str) {
        self.metadata.insert(key.to_string(), "true".to_string());
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.metadata.get(key).map(|v| v == "true").unwrap_or(false)
    }

    /// 主语言：`language` 元数据，缺失时使用默认值
    pub fn main_language<'a>(&'a self, default: &'a str) -> &'a str {
        self.metadata_value(metadata_keys::LANGUAGE)
            .unwrap_or(default)
    }

    /// 可以写入 EPUB 的 Dublin Core 字段（排除记账键）
    pub fn publication_metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata
            .iter()
            .filter(|(key, value)| {
                !key.starts_with(metadata_keys::BOOKKEEPING_PREFIX) && !value.trim().is_empty()
            })
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// 图片是否有非空内容
    pub fn has_image_content(&self, filename: &str) -> bool {
        self.image_contents
            .get(filename)
            .map(|bytes| !bytes.is_empty())
            .unwrap_or(false)
    }
}
