//! Pipeline Phases - 十个转换阶段
//!
//! 每个阶段实现 `PipelinePhase`，由 infrastructure/worker 中的编排器按顺序串联

mod alt_text;
mod chapter_tree;
mod epub_assembler;
mod image_catalog;
mod lang_markup;
mod metadata_gate;
mod story_extractor;
mod story_schema;
mod style_normalizer;
mod toc;
mod xhtml_renderer;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use crate::application::ports::{ImageDescriberPort, LanguageDetectorPort, PipelinePhase};

pub use alt_text::{propose_alt_texts, AltTextPhase, AltTextProposal};
pub use chapter_tree::{build_chapter_tree, ChapterTreePhase};
pub use epub_assembler::{assemble_epub, package_document, EpubAssemblyPhase, EPUB_MIMETYPE};
pub use image_catalog::{collect_image_descriptors, fetch_image_contents, ImageCatalogPhase};
pub use lang_markup::{propose_lang_markup, LangMarkupPhase};
pub use metadata_gate::{find_missing, MetadataGatePhase};
pub use story_extractor::{extract_stories, StoryExtractionPhase, CONTAINER_MANIFEST};
pub use style_normalizer::{normalize_styles, StyleNormalizationPhase};
pub use toc::{collect_toc_entries, render_toc, TocEntry, TocGenerationPhase};
pub use xhtml_renderer::{heading_level, render_xhtml, XhtmlRenderPhase};

/// 构造阶段所需的设置
#[derive(Debug, Clone)]
pub struct PhaseSettings {
    /// 元数据未给出 `language` 时使用的主语言
    pub default_language: String,
    /// 替代文本是否需要人工确认
    pub review_alt_texts: bool,
    /// 语言标记是否需要人工确认
    pub review_lang_markup: bool,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            default_language: "fi".to_string(),
            review_alt_texts: true,
            review_lang_markup: true,
        }
    }
}

/// 按执行顺序构造全部阶段
pub fn build_phases(
    settings: &PhaseSettings,
    describer: Arc<dyn ImageDescriberPort>,
    detector: Arc<dyn LanguageDetectorPort>,
) -> Vec<Arc<dyn PipelinePhase>> {
    vec![
        Arc::new(StoryExtractionPhase),
        Arc::new(ChapterTreePhase),
        Arc::new(ImageCatalogPhase),
        Arc::new(StyleNormalizationPhase),
        Arc::new(MetadataGatePhase),
        Arc::new(AltTextPhase::new(describer, settings.review_alt_texts)),
        Arc::new(LangMarkupPhase::new(
            detector,
            settings.default_language.clone(),
            settings.review_lang_markup,
        )),
        Arc::new(XhtmlRenderPhase::new(settings.default_language.clone())),
        Arc::new(TocGenerationPhase::new(settings.default_language.clone())),
        Arc::new(EpubAssemblyPhase::new(settings.default_language.clone())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::Phase;

    #[test]
    fn test_phases_in_pipeline_order() {
        struct Silent;

        #[async_trait::async_trait]
        impl ImageDescriberPort for Silent {
            async fn describe_image(
                &self,
                _image: &[u8],
            ) -> Result<Option<String>, crate::application::ports::ProviderError> {
                Ok(None)
            }
        }

        #[async_trait::async_trait]
        impl LanguageDetectorPort for Silent {
            async fn detect_non_main_language_words(
                &self,
                _text: &str,
                _main_language: &str,
            ) -> Result<Option<String>, crate::application::ports::ProviderError> {
                Ok(None)
            }
        }

        let phases = build_phases(&PhaseSettings::default(), Arc::new(Silent), Arc::new(Silent));
        let order: Vec<Phase> = phases.iter().map(|p| p.phase()).collect();
        assert_eq!(order, Phase::ALL.to_vec());
    }
}
