//! Image Catalog - 图片扁平列表与内容提取
//!
//! 直接扫描解析后的故事文档；完成后释放故事文档

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use super::story_schema::{descriptor_from_link, top_level_stories, LINK};
use crate::application::ports::{Phase, PhaseOutcome, PipelineError, PipelinePhase};
use crate::domain::document::ImageDescriptor;
use crate::domain::package::{entry_name, percent_encode_segments, PackageArchive, XmlElement};
use crate::domain::processing::ProcessingContext;

/// 每个链接元素一项（文档顺序），与章节树的图片叶子一一对应
pub fn collect_image_descriptors(documents: &[XmlElement]) -> Vec<ImageDescriptor> {
    documents
        .iter()
        .flat_map(top_level_stories)
        .flat_map(|story| story.descendants_named(LINK))
        .map(descriptor_from_link)
        .collect()
}

/// 按 filename 提取图片字节
///
/// 每个不同的 URI 只读取一次；同名文件以首次出现为准；找不到的图片不记录
pub fn fetch_image_contents(
    raw: &[u8],
    images: &[ImageDescriptor],
) -> Result<BTreeMap<String, Vec<u8>>, PipelineError> {
    let mut contents = BTreeMap::new();
    if images.is_empty() {
        return Ok(contents);
    }

    let mut archive = PackageArchive::open(raw)?;
    let mut fetched_uris = HashSet::new();

    for image in images {
        if !fetched_uris.insert(image.resource_uri.as_str()) {
            continue;
        }
        if contents.contains_key(&image.filename) {
            continue;
        }
        match lookup_entry(&mut archive, &image.resource_uri) {
            Some(bytes) => {
                contents.insert(image.filename.clone(), bytes);
            }
            None => {
                tracing::debug!(uri = %image.resource_uri, "Linked image not found in package");
            }
        }
    }

    Ok(contents)
}

/// 先按字面条目名查找，再按百分号编码后的条目名查找
fn lookup_entry(archive: &mut PackageArchive<'_>, uri: &str) -> Option<Vec<u8>> {
    let literal = entry_name(uri);
    let encoded = percent_encode_segments(&literal);

    let mut candidates = vec![literal];
    if encoded != candidates[0] {
        candidates.push(encoded);
    }

    for name in candidates {
        match archive.read_entry(&name) {
            Ok(Some(bytes)) => return Some(bytes),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(entry = %name, error = %e, "Linked image unreadable");
            }
        }
    }
    None
}

/// 阶段三：图片目录
pub struct ImageCatalogPhase;

#[async_trait]
impl PipelinePhase for ImageCatalogPhase {
    fn phase(&self) -> Phase {
        Phase::ImageCatalog
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        context.images = collect_image_descriptors(&context.story_documents);
        context.image_contents = match fetch_image_contents(&context.raw_bytes, &context.images) {
            Ok(contents) => contents,
            Err(e) => return PhaseOutcome::fail(e),
        };
        context.story_documents = Vec::new();

        tracing::debug!(
            file_id = %context.file_id,
            occurrences = context.images.len(),
            fetched = context.image_contents.len(),
            "Image catalog built"
        );
        PhaseOutcome::proceed(context)
    }
}
