//! XHTML Renderer - 章节树渲染为单个 XHTML 文档
//!
//! 每个节点按前序获得编号 `s<N>`（从 1 开始），目录使用同一编号。
//! 段落容器把连续的文本叶子合并为一个 `<p>`，带标题样式时合并为 `<hN>`。

use async_trait::async_trait;
use quick_xml::escape::escape;

use crate::application::ports::{Phase, PhaseOutcome, PipelinePhase};
use crate::domain::document::ChapterNode;
use crate::domain::package::percent_encode_segments;
use crate::domain::processing::{metadata_keys, ProcessingContext};

/// 图片在 EPUB 中的目录
pub const IMAGE_DIR: &str = "images";

/// 元素 id：`s<N>`
pub fn section_id(number: usize) -> String {
    format!("s{}", number)
}

/// 标题样式对应的级别（1-6）
///
/// `Title` 为 1；`Heading 2`、`heading3` 等按数字取级别
pub fn heading_level(style: Option<&str>) -> Option<u8> {
    let lower = style?.trim().to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    let rest = lower.strip_prefix("heading")?.trim();
    if rest.is_empty() {
        return Some(1);
    }
    let level: u32 = rest.parse().ok()?;
    Some(level.clamp(1, 6) as u8)
}

/// 前序编号器
#[derive(Debug, Default)]
pub struct SectionCounter {
    current: usize,
}

impl SectionCounter {
    pub fn next_id(&mut self) -> usize {
        self.current += 1;
        self.current
    }
}

/// 文本片段（合并段落时使用）
struct TextRun<'a> {
    style: Option<&'a str>,
    text: &'a str,
    language: Option<&'a str>,
}

struct Renderer {
    out: String,
    ids: SectionCounter,
}

impl Renderer {
    fn new() -> Self {
        Self {
            out: String::new(),
            ids: SectionCounter::default(),
        }
    }

    fn open_section(&mut self, id: usize, kind: &str, style: Option<&str>) {
        self.out.push_str(&format!(
            "<section id=\"{}\" data-node=\"{}\"",
            section_id(id),
            kind
        ));
        if let Some(style) = style {
            let style = escape(style);
            self.out
                .push_str(&format!(" data-style=\"{}\" class=\"{}\"", style, style));
        }
        self.out.push('>');
    }

    fn render_node(&mut self, node: &ChapterNode) {
        let id = self.ids.next_id();
        match node {
            ChapterNode::Story { style, children } => {
                self.open_section(id, "story", style.as_deref());
                for child in children {
                    self.render_node(child);
                }
                self.out.push_str("</section>\n");
            }
            ChapterNode::ParagraphRange { style, children } => {
                self.open_section(id, "paragraph", style.as_deref());
                self.render_paragraph_children(children, heading_level(style.as_deref()));
                self.out.push_str("</section>\n");
            }
            ChapterNode::CharacterRange {
                style,
                text,
                language,
            } => {
                self.open_section(id, "text", style.as_deref());
                self.out.push_str("<p>");
                self.push_run(&TextRun {
                    style: None,
                    text,
                    language: language.as_deref(),
                });
                self.out.push_str("</p></section>\n");
            }
            ChapterNode::Image {
                style,
                filename,
                alt_text,
                ..
            } => {
                self.open_section(id, "image", style.as_deref());
                self.push_figure(None, filename, alt_text.as_deref());
                self.out.push_str("</section>\n");
            }
        }
    }

    fn render_paragraph_children(&mut self, children: &[ChapterNode], level: Option<u8>) {
        let mut run: Vec<TextRun<'_>> = Vec::new();
        let mut run_id = 0;

        for child in children {
            match child {
                ChapterNode::CharacterRange {
                    style,
                    text,
                    language,
                } => {
                    let id = self.ids.next_id();
                    if run.is_empty() {
                        run_id = id;
                    }
                    run.push(TextRun {
                        style: style.as_deref(),
                        text,
                        language: language.as_deref(),
                    });
                }
                ChapterNode::Image {
                    filename, alt_text, ..
                } => {
                    self.flush_run(&mut run, run_id, level);
                    let id = self.ids.next_id();
                    self.push_figure(Some(id), filename, alt_text.as_deref());
                }
                container => {
                    self.flush_run(&mut run, run_id, level);
                    self.render_node(container);
                }
            }
        }
        self.flush_run(&mut run, run_id, level);
    }

    fn flush_run(&mut self, run: &mut Vec<TextRun<'_>>, id: usize, level: Option<u8>) {
        if run.is_empty() {
            return;
        }
        let tag = match level {
            Some(level) => format!("h{}", level),
            None => "p".to_string(),
        };
        self.out
            .push_str(&format!("<{} id=\"{}\">", tag, section_id(id)));
        for text_run in run.drain(..) {
            self.push_run(&text_run);
        }
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn push_run(&mut self, run: &TextRun<'_>) {
        if run.style.is_none() && run.language.is_none() {
            self.out.push_str(&escape(run.text));
            return;
        }
        self.out.push_str("<span");
        if let Some(style) = run.style {
            self.out.push_str(&format!(" class=\"{}\"", escape(style)));
        }
        if let Some(language) = run.language {
            let language = escape(language);
            self.out
                .push_str(&format!(" lang=\"{}\" xml:lang=\"{}\"", language, language));
        }
        self.out.push('>');
        self.out.push_str(&escape(run.text));
        self.out.push_str("</span>");
    }

    fn push_figure(&mut self, id: Option<usize>, filename: &str, alt_text: Option<&str>) {
        match id {
            Some(id) => self
                .out
                .push_str(&format!("<figure id=\"{}\">", section_id(id))),
            None => self.out.push_str("<figure>"),
        }
        self.out.push_str(&format!(
            "<img src=\"{}/{}\" alt=\"{}\"/></figure>\n",
            IMAGE_DIR,
            escape(&percent_encode_segments(filename)),
            escape(alt_text.unwrap_or_default())
        ));
    }
}

/// 渲染完整 XHTML 文档
pub fn render_xhtml(tree: &[ChapterNode], title: &str, language: &str) -> String {
    let mut renderer = Renderer::new();
    for node in tree {
        renderer.render_node(node);
    }

    let language = escape(language);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n\
         <head>\n<meta charset=\"UTF-8\"/>\n<title>{title}</title>\n</head>\n\
         <body>\n{body}</body>\n</html>\n",
        lang = language,
        title = escape(title),
        body = renderer.out,
    )
}

/// 阶段八：XHTML 渲染
pub struct XhtmlRenderPhase {
    default_language: String,
}

impl XhtmlRenderPhase {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }
}

#[async_trait]
impl PipelinePhase for XhtmlRenderPhase {
    fn phase(&self) -> Phase {
        Phase::XhtmlRender
    }

    async fn run(&self, mut context: ProcessingContext) -> PhaseOutcome {
        let title = context
            .metadata_value(metadata_keys::TITLE)
            .unwrap_or(&context.original_filename)
            .to_string();
        let language = context.main_language(&self.default_language).to_string();
        let xhtml = render_xhtml(&context.chapter_tree, &title, &language);
        context.xhtml = Some(xhtml.into_bytes());
        PhaseOutcome::proceed(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::ImageDescriptor;

    fn lang_text(text: &str, language: &str) -> ChapterNode {
        ChapterNode::CharacterRange {
            style: None,
            text: text.to_string(),
            language: Some(language.to_string()),
        }
    }

    fn image(filename: &str, alt: Option<&str>) -> ChapterNode {
        let mut descriptor = ImageDescriptor::new(
            format!("Links/{}", filename),
            filename.to_string(),
            "png".to_string(),
        );
        descriptor.alt_text = alt.map(str::to_string);
        ChapterNode::image(&descriptor)
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(heading_level(Some("Heading 2")), Some(2));
        assert_eq!(heading_level(Some("heading9")), Some(6));
        assert_eq!(heading_level(Some("Title")), Some(1));
        assert_eq!(heading_level(Some("Heading")), Some(1));
        assert_eq!(heading_level(Some("Body")), None);
        assert_eq!(heading_level(Some("Heading Large")), None);
        assert_eq!(heading_level(None), None);
    }

    #[test]
    fn test_empty_tree_has_no_sections() {
        let xhtml = render_xhtml(&[], "Kirja", "fi");
        assert!(!xhtml.contains("<section"));
        assert!(xhtml.contains("<title>Kirja</title>"));
        assert!(xhtml.contains("xml:lang=\"fi\""));
    }

    #[test]
    fn test_paragraph_merges_runs_and_tags_languages() {
        let tree = vec![ChapterNode::story(vec![ChapterNode::paragraph(
            Some("Body".to_string()),
            vec![
                ChapterNode::text("Tämä on "),
                lang_text("English", "und"),
                ChapterNode::text(" <ja> & \"muuta\" ei'kä"),
            ],
        )])];
        let xhtml = render_xhtml(&tree, "T", "fi");

        assert!(xhtml.contains("<section id=\"s1\" data-node=\"story\">"));
        assert!(xhtml.contains(
            "<section id=\"s2\" data-node=\"paragraph\" data-style=\"Body\" class=\"Body\">"
        ));
        assert!(xhtml.contains(
            "<p id=\"s3\">Tämä on <span lang=\"und\" xml:lang=\"und\">English</span> &lt;ja&gt; &amp; &quot;muuta&quot; ei&apos;kä</p>"
        ));
        assert!(!xhtml.contains("<ja>"));
    }

    #[test]
    fn test_titled_paragraph_renders_heading() {
        let tree = vec![ChapterNode::story(vec![ChapterNode::paragraph(
            Some("Heading 2".to_string()),
            vec![ChapterNode::text("Luku 1")],
        )])];
        let xhtml = render_xhtml(&tree, "T", "fi");
        assert!(xhtml.contains("<h2 id=\"s3\">Luku 1</h2>"));
    }

    #[test]
    fn test_image_inside_paragraph_splits_runs() {
        let tree = vec![ChapterNode::story(vec![ChapterNode::paragraph(
            None,
            vec![
                ChapterNode::text("before"),
                image("kuva 1.png", Some("A \"quoted\" cat")),
                ChapterNode::text("after"),
            ],
        )])];
        let xhtml = render_xhtml(&tree, "T", "fi");

        assert!(xhtml.contains("<p id=\"s3\">before</p>"));
        assert!(xhtml.contains(
            "<figure id=\"s4\"><img src=\"images/kuva%201.png\" alt=\"A &quot;quoted&quot; cat\"/></figure>"
        ));
        assert!(xhtml.contains("<p id=\"s5\">after</p>"));
    }

    #[test]
    fn test_standalone_leaves_get_sections() {
        let tree = vec![ChapterNode::story(vec![
            ChapterNode::text("loose").with_style(Some("Caption".to_string())),
            image("a.png", None),
        ])];
        let xhtml = render_xhtml(&tree, "T", "fi");
        assert!(xhtml.contains(
            "<section id=\"s2\" data-node=\"text\" data-style=\"Caption\" class=\"Caption\"><p>loose</p></section>"
        ));
        assert!(xhtml.contains(
            "<section id=\"s3\" data-node=\"image\"><figure><img src=\"images/a.png\" alt=\"\"/></figure></section>"
        ));
    }
}
