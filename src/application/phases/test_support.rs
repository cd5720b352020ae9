//! 测试用排版包构造器

use crate::domain::package::PackageWriter;
use crate::domain::processing::{ProcessingContext, UploadSeed};

use super::story_extractor::CONTAINER_MANIFEST;

const DESIGNMAP: &str = "designmap.xml";

/// 构造一个最小排版包：容器清单 + designmap + 故事 + 链接资源
pub struct PackageBuilder {
    media_type: String,
    story_refs: Vec<String>,
    entries: Vec<(String, Vec<u8>)>,
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            media_type: "text/xml".to_string(),
            story_refs: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn rootfile_media_type(mut self, media_type: &str) -> Self {
        self.media_type = media_type.to_string();
        self
    }

    pub fn story(mut self, path: &str, xml: &str) -> Self {
        self.story_refs.push(path.to_string());
        self.entries.push((path.to_string(), xml.as_bytes().to_vec()));
        self
    }

    /// 只在 designmap 中引用，不写入条目
    pub fn story_reference_only(mut self, path: &str) -> Self {
        self.story_refs.push(path.to_string());
        self
    }

    pub fn entry(mut self, name: &str, bytes: &[u8]) -> Self {
        self.entries.push((name.to_string(), bytes.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let container = format!(
            "<container><rootfiles><rootfile full-path=\"{}\" media-type=\"{}\"/></rootfiles></container>",
            DESIGNMAP, self.media_type
        );
        let stories: String = self
            .story_refs
            .iter()
            .map(|path| format!("<Story src=\"{}\"/>", path))
            .collect();
        let designmap = format!("<Document>{}</Document>", stories);

        let mut writer = PackageWriter::new();
        writer.add_deflated(CONTAINER_MANIFEST, container.as_bytes()).unwrap();
        writer.add_deflated(DESIGNMAP, designmap.as_bytes()).unwrap();
        for (name, bytes) in &self.entries {
            writer.add_deflated(name, bytes).unwrap();
        }
        writer.finish().unwrap()
    }
}

/// 任意条目组成的 zip
pub fn package_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = PackageWriter::new();
    for (name, content) in entries {
        writer.add_deflated(name, content.as_bytes()).unwrap();
    }
    writer.finish().unwrap()
}

pub fn context_with_package(bytes: Vec<u8>) -> ProcessingContext {
    ProcessingContext::new(UploadSeed {
        original_filename: "book.idml".to_string(),
        content_type: "application/zip".to_string(),
        bytes,
    })
}

pub fn empty_context() -> ProcessingContext {
    context_with_package(Vec::new())
}
