//! Story Extractor - 定位并解析容器清单与故事文档

use async_trait::async_trait;

use super::story_schema::{STORY, STORY_SRC_ATTR};
use crate::application::ports::{Phase, PhaseOutcome, PipelineError, PipelinePhase};
use crate::domain::package::{parse_document, PackageArchive, XmlElement};
use crate::domain::processing::ProcessingContext;

/// 固定的容器清单位置
pub const CONTAINER_MANIFEST: &str = "META-INF/container.xml";

/// rootfile 必须声明的媒体类型
pub const ROOTFILE_MEDIA_TYPE: &str = "text/xml";

/// 提取全部故事文档（文档顺序）
///
/// 清单缺失、媒体类型不符、rootfile 不可读均为校验失败；
/// 单个故事条目缺失或解析失败只记录警告并跳过
pub fn extract_stories(raw: &[u8]) -> Result<Vec<XmlElement>, PipelineError> {
    let mut archive = PackageArchive::open(raw)
        .map_err(|e| PipelineError::validation(format!("package is not a readable archive: {}", e)))?;

    let manifest_bytes = archive
        .read_entry(CONTAINER_MANIFEST)
        .map_err(|e| PipelineError::validation(format!("cannot read {}: {}", CONTAINER_MANIFEST, e)))?
        .ok_or_else(|| {
            PipelineError::validation(format!("missing container manifest {}", CONTAINER_MANIFEST))
        })?;
    let manifest = parse_document(&manifest_bytes)
        .map_err(|e| PipelineError::validation(format!("malformed container manifest: {}", e)))?;

    let rootfile = manifest
        .descendants_named("rootfile")
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::validation("container manifest declares no rootfile"))?;

    let media_type = rootfile.attr("media-type").unwrap_or_default();
    if media_type != ROOTFILE_MEDIA_TYPE {
        return Err(PipelineError::validation(format!(
            "unsupported rootfile media type '{}' (expected {})",
            media_type, ROOTFILE_MEDIA_TYPE
        )));
    }

    let root_path = rootfile
        .attr("full-path")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| PipelineError::validation("rootfile has no full-path"))?;
    let root_bytes = archive
        .read_entry(root_path)
        .map_err(|e| PipelineError::validation(format!("cannot read rootfile {}: {}", root_path, e)))?
        .ok_or_else(|| PipelineError::validation(format!("rootfile {} not found", root_path)))?;
    let root_document = parse_document(&root_bytes)
        .map_err(|e| PipelineError::validation(format!("malformed rootfile {}: {}", root_path, e)))?;

    let story_paths: Vec<&str> = root_document
        .descendants_named(STORY)
        .into_iter()
        .filter_map(|story| story.attr(STORY_SRC_ATTR))
        .collect();

    let mut documents = Vec::with_capacity(story_paths.len());
    for path in story_paths {
        match archive.read_entry(path) {
            Ok(Some(bytes)) => match parse_document(&bytes) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!(story = %path, error = %e, "Story failed to parse, skipping");
                }
            },
            Ok(None) => {
                tracing::warn!(story = %path, "Story entry missing from package, skipping");
            }
            Err(e) => {
                tracing::warn!(story = %path, error = %e, "Story entry unreadable, skipping");
            }
        }
    }

    Ok(documents)
}

/// 阶段一：故事提取
pub struct StoryExtractionPhase;

#[async_trait]
impl PipelinePhase for StoryExtractionPhase {
    fn phase(&self) -> Phase {
        Phase::StoryExtraction
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        match extract_stories(&context.raw_bytes) {
            Ok(documents) => {
                tracing::debug!(
                    file_id = %context.file_id,
                    stories = documents.len(),
                    "Stories extracted"
                );
                context.story_documents = documents;
                PhaseOutcome::proceed(context)
            }
            Err(e) => PhaseOutcome::fail(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::phases::test_support::{package_bytes, PackageBuilder};

    #[test]
    fn test_extracts_stories_in_designmap_order() {
        let bytes = PackageBuilder::new()
            .story("Stories/Story_b.xml", "<Story Self=\"b\"><Content>B</Content></Story>")
            .story("Stories/Story_a.xml", "<Story Self=\"a\"><Content>A</Content></Story>")
            .build();
        let documents = extract_stories(&bytes).unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].attr("Self"), Some("b"));
        assert_eq!(documents[1].attr("Self"), Some("a"));
    }

    #[test]
    fn test_missing_and_broken_stories_are_skipped() {
        let bytes = PackageBuilder::new()
            .story("Stories/ok.xml", "<Story><Content>ok</Content></Story>")
            .story("Stories/broken.xml", "<Story><Content>oops</Story>")
            .story_reference_only("Stories/missing.xml")
            .build();
        let documents = extract_stories(&bytes).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text_content(), "ok");
    }

    #[test]
    fn test_wrong_media_type_is_validation_failure() {
        let bytes = PackageBuilder::new()
            .rootfile_media_type("application/xml")
            .build();
        let err = extract_stories(&bytes).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("application/xml"));
    }

    #[test]
    fn test_missing_manifest_is_validation_failure() {
        let bytes = package_bytes(&[("designmap.xml", "<Document/>")]);
        assert!(matches!(
            extract_stories(&bytes),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_manifest_without_rootfile() {
        let bytes = package_bytes(&[(
            CONTAINER_MANIFEST,
            "<container><rootfiles/></container>",
        )]);
        let err = extract_stories(&bytes).unwrap_err();
        assert!(err.to_string().contains("no rootfile"));
    }

    #[test]
    fn test_not_an_archive() {
        assert!(matches!(
            extract_stories(b"plain text"),
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_phase_fills_story_documents() {
        let bytes = PackageBuilder::new()
            .story("Stories/s.xml", "<Story><Content>x</Content></Story>")
            .build();
        let context = crate::application::phases::test_support::context_with_package(bytes);
        match StoryExtractionPhase.run(context).await {
            PhaseOutcome::Continue(ctx) => assert_eq!(ctx.story_documents.len(), 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
