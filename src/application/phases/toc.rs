//! TOC Generator - EPUB3 导航文档
//!
//! 带标题样式的容器成为目录项，链接到正文中的同一编号

use async_trait::async_trait;
use quick_xml::escape::escape;

use super::xhtml_renderer::{heading_level, section_id, SectionCounter};
use crate::application::ports::{Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::{walk_tree, ChapterNode};
use crate::domain::processing::{metadata_keys, ProcessingContext};

/// 正文文档在 EPUB 中的文件名
pub const CONTENT_DOCUMENT: &str = "content.xhtml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub label: String,
    pub target: String,
}

/// 前序收集目录项，编号与渲染器一致
pub fn collect_toc_entries(tree: &[ChapterNode]) -> Vec<TocEntry> {
    let mut ids = SectionCounter::default();
    let mut entries = Vec::new();
    walk_tree(tree, |node| {
        let id = ids.next_id();
        if !node.is_container() {
            return;
        }
        let Some(level) = heading_level(node.style()) else {
            return;
        };
        let label = node.text_content().trim().to_string();
        if label.is_empty() {
            return;
        }
        entries.push(TocEntry {
            level,
            label,
            target: format!("{}#{}", CONTENT_DOCUMENT, section_id(id)),
        });
    });
    entries
}

/// 按级别嵌套 `<ol>`
fn render_entries(entries: &[TocEntry], fallback_label: &str) -> String {
    if entries.is_empty() {
        return format!(
            "<ol><li><a href=\"{}\">{}</a></li></ol>",
            CONTENT_DOCUMENT,
            escape(fallback_label)
        );
    }

    let mut out = String::new();
    let mut levels: Vec<u8> = Vec::new();
    // levels 严格递增；跳级时项挂在最近的较浅级别之下
    for entry in entries {
        while levels.len() > 1 && levels[levels.len() - 2] >= entry.level {
            out.push_str("</li></ol>");
            levels.pop();
        }
        match levels.last_mut() {
            Some(top) if entry.level <= *top => {
                out.push_str("</li>");
                *top = entry.level;
            }
            _ => {
                out.push_str("<ol>");
                levels.push(entry.level);
            }
        }
        out.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            escape(&entry.target),
            escape(&entry.label)
        ));
    }
    out.push_str("</li>");
    while levels.pop().is_some() {
        out.push_str("</ol>");
        if !levels.is_empty() {
            out.push_str("</li>");
        }
    }
    out
}

/// 生成导航文档
pub fn render_toc(tree: &[ChapterNode], title: &str, language: &str) -> String {
    let entries = collect_toc_entries(tree);
    let language = escape(language);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n\
         <head>\n<meta charset=\"UTF-8\"/>\n<title>{title}</title>\n</head>\n\
         <body>\n<nav epub:type=\"toc\" id=\"toc\">\n<h1>{title}</h1>\n{list}\n</nav>\n</body>\n</html>\n",
        lang = language,
        title = escape(title),
        list = render_entries(&entries, title),
    )
}

/// 阶段九：目录生成
pub struct TocGenerationPhase {
    default_language: String,
}

impl TocGenerationPhase {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }
}

#[async_trait]
impl PipelinePhase for TocGenerationPhase {
    fn phase(&self) -> Phase {
        Phase::TocGeneration
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        let title = context
            .metadata_value(metadata_keys::TITLE)
            .unwrap_or(&context.original_filename)
            .to_string();
        let language = context.main_language(&self.default_language).to_string();
        context.toc = Some(render_toc(&context.chapter_tree, &title, &language).into_bytes());
        PhaseOutcome::proceed(context)
    }
}
