//! EPUB Assembler - 打包最终出版物
//!
//! 条目顺序: mimetype（不压缩，位于首位）、容器清单、OPF、导航、正文、图片

use async_trait::async_trait;
use quick_xml::escape::escape;
use std::collections::BTreeMap;

use super::toc::CONTENT_DOCUMENT;
use super::xhtml_renderer::IMAGE_DIR;
use crate::application::ports::{Phase, PhaseOutcome, PipelineError, PipelinePhase};
use crate::domain::package::{media_type_for, percent_encode_segments, PackageWriter};
use crate::domain::processing::{metadata_keys, ProcessingContext};

pub const EPUB_MIMETYPE: &str = "application/epub+zip";
pub const NAV_DOCUMENT: &str = "nav.xhtml";
pub const PACKAGE_DOCUMENT: &str = "content.opf";
const CONTENT_DIR: &str = "OEBPS";

/// 写入 OPF 的 Dublin Core 元素（按此顺序）
const DUBLIN_CORE_ELEMENTS: &[&str] = &[
    "identifier",
    "title",
    "language",
    "creator",
    "contributor",
    "publisher",
    "date",
    "description",
    "subject",
    "rights",
    "source",
    "type",
    "format",
    "relation",
    "coverage",
];

fn container_manifest() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
         <rootfiles>\n<rootfile full-path=\"{}/{}\" media-type=\"application/oebps-package+xml\"/>\n</rootfiles>\n\
         </container>\n",
        CONTENT_DIR, PACKAGE_DOCUMENT
    )
}

/// filename -> 格式（首次出现为准）
fn image_formats(context: &ProcessingContext) -> BTreeMap<&str, &str> {
    let mut formats = BTreeMap::new();
    for image in &context.images {
        formats
            .entry(image.filename.as_str())
            .or_insert(image.format.as_str());
    }
    formats
}

/// 生成 OPF 包文档
pub fn package_document(context: &ProcessingContext, default_language: &str) -> String {
    let mut metadata = String::new();
    let fields: BTreeMap<&str, &str> = context.publication_metadata().collect();
    for element in DUBLIN_CORE_ELEMENTS {
        let value = match *element {
            "language" => Some(context.main_language(default_language)),
            "identifier" => Some(
                fields
                    .get("identifier")
                    .copied()
                    .unwrap_or(&context.original_filename),
            ),
            other => fields.get(other).copied(),
        };
        let Some(value) = value else {
            continue;
        };
        if *element == "identifier" {
            metadata.push_str(&format!(
                "<dc:identifier id=\"pub-id\">{}</dc:identifier>\n",
                escape(value)
            ));
        } else {
            metadata.push_str(&format!(
                "<dc:{el}>{}</dc:{el}>\n",
                escape(value),
                el = element
            ));
        }
    }
    metadata.push_str(&format!(
        "<meta property=\"dcterms:modified\">{}</meta>\n",
        context.uploaded_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));

    let mut manifest = format!(
        "<item id=\"nav\" href=\"{}\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n\
         <item id=\"content\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
        NAV_DOCUMENT, CONTENT_DOCUMENT
    );
    let formats = image_formats(context);
    for (index, filename) in context.image_contents.keys().enumerate() {
        let format = formats.get(filename.as_str()).copied().unwrap_or_default();
        manifest.push_str(&format!(
            "<item id=\"img-{}\" href=\"{}/{}\" media-type=\"{}\"/>\n",
            index + 1,
            IMAGE_DIR,
            escape(&percent_encode_segments(filename)),
            media_type_for(format)
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"pub-id\">\n\
         <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n{}</metadata>\n\
         <manifest>\n{}</manifest>\n\
         <spine>\n<itemref idref=\"content\"/>\n</spine>\n\
         </package>\n",
        metadata, manifest
    )
}

/// 组装 EPUB 字节
pub fn assemble_epub(
    context: &ProcessingContext,
    default_language: &str,
) -> Result<Vec<u8>, PipelineError> {
    let xhtml = context.xhtml.as_deref().ok_or_else(|| {
        PipelineError::unexpected(Phase::EpubAssembly, "rendered content is missing")
    })?;
    let toc = context.toc.as_deref().ok_or_else(|| {
        PipelineError::unexpected(Phase::EpubAssembly, "navigation document is missing")
    })?;

    let mut writer = PackageWriter::new();
    writer.add_stored("mimetype", EPUB_MIMETYPE.as_bytes())?;
    writer.add_deflated("META-INF/container.xml", container_manifest().as_bytes())?;
    writer.add_deflated(
        &format!("{}/{}", CONTENT_DIR, PACKAGE_DOCUMENT),
        package_document(context, default_language).as_bytes(),
    )?;
    writer.add_deflated(&format!("{}/{}", CONTENT_DIR, NAV_DOCUMENT), toc)?;
    writer.add_deflated(&format!("{}/{}", CONTENT_DIR, CONTENT_DOCUMENT), xhtml)?;
    for (filename, bytes) in &context.image_contents {
        writer.add_deflated(
            &format!("{}/{}/{}", CONTENT_DIR, IMAGE_DIR, filename),
            bytes,
        )?;
    }
    Ok(writer.finish()?)
}

/// 阶段十：EPUB 组装
pub struct EpubAssemblyPhase {
    default_language: String,
}

impl EpubAssemblyPhase {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }
}

#[async_trait]
impl PipelinePhase for EpubAssemblyPhase {
    fn phase(&self) -> Phase {
        Phase::EpubAssembly
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        match assemble_epub(&context, &self.default_language) {
            Ok(epub) => {
                tracing::debug!(
                    file_id = %context.file_id,
                    bytes = epub.len(),
                    title = ?context.metadata_value(metadata_keys::TITLE),
                    "EPUB assembled"
                );
                context.epub = Some(epub);
                PhaseOutcome::proceed(context)
            }
            Err(e) => PhaseOutcome::fail(e),
        }
    }
}
