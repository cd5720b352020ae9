//! Document Context - Image Descriptor

use serde::{Deserialize, Serialize};

/// 图片描述符（扁平列表条目）
///
/// 与树中 Image 叶子仅通过 filename 关联，不共享身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// 解码并 NFC 规范化后的资源 URI
    pub resource_uri: String,
    /// URI 的最后一段路径
    pub filename: String,
    /// 规范化格式（jpeg / png / ...）
    pub format: String,
    /// 替代文本
    pub alt_text: Option<String>,
}

impl ImageDescriptor {
    pub fn new(resource_uri: String, filename: String, format: String) -> Self {
        Self {
            resource_uri,
            filename,
            format,
            alt_text: None,
        }
    }

    /// 替代文本是否缺失（None 或全空白）
    pub fn lacks_alt_text(&self) -> bool {
        is_blank(self.alt_text.as_deref())
    }
}

/// None 或仅含空白
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
