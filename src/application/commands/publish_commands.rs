//! Publish Commands - 提交排版包与评审决定

use std::collections::BTreeMap;

use crate::domain::processing::FileId;

/// 提交排版包命令
#[derive(Debug, Clone)]
pub struct SubmitPackage {
    pub original_filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    /// 调用方提供的元数据，覆盖配置中的默认值
    pub metadata: BTreeMap<String, String>,
}

/// 提交响应
#[derive(Debug, Clone)]
pub struct SubmitPackageResponse {
    pub file_id: FileId,
}

/// 补全元数据命令
///
/// `images` 以文件名为键补充包内缺失的图片
#[derive(Debug, Clone, Default)]
pub struct ProvideMetadata {
    pub file_id: FileId,
    pub metadata: BTreeMap<String, String>,
    pub images: BTreeMap<String, Vec<u8>>,
}

/// 替代文本编辑：(图片出现序号, 文本)
pub type AltTextEdit = (usize, String);

/// 确认替代文本命令
#[derive(Debug, Clone)]
pub struct ApproveAltTexts {
    pub file_id: FileId,
    pub edits: Vec<AltTextEdit>,
}

/// 语言标记编辑：(标记出现序号, 语言)；None 表示移除标记
pub type LangMarkupEdit = (usize, Option<String>);

/// 确认语言标记命令
#[derive(Debug, Clone)]
pub struct ApproveLangMarkup {
    pub file_id: FileId,
    pub edits: Vec<LangMarkupEdit>,
}

/// 评审通过后的响应
#[derive(Debug, Clone)]
pub struct ResumeResponse {
    pub file_id: FileId,
    /// 重新进入的阶段
    pub resumed_at: &'static str,
}
