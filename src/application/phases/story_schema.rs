//! Story Schema - 故事文档的元素与属性名
//!
//! 章节树构建与图片目录都依赖这些约定，集中在此保证二者遍历一致

use crate::domain::document::ImageDescriptor;
use crate::domain::package::{decode_resource_uri, normalize_format, resolve_filename, XmlElement};

pub const STORY: &str = "Story";
pub const CONTENT: &str = "Content";
pub const LINK: &str = "Link";
pub const CHARACTER_RANGE: &str = "CharacterStyleRange";
pub const PARAGRAPH_RANGE: &str = "ParagraphStyleRange";

pub const CHARACTER_STYLE_ATTR: &str = "AppliedCharacterStyle";
pub const PARAGRAPH_STYLE_ATTR: &str = "AppliedParagraphStyle";
pub const LINK_URI_ATTR: &str = "LinkResourceURI";
pub const LINK_FORMAT_ATTR: &str = "LinkResourceFormat";
pub const STORY_SRC_ATTR: &str = "src";

/// 顶层故事元素（文档顺序）
///
/// 打包格式用同名的 `Story` 包裹真正的故事元素；直接包含 `Story` 子元素的视为包装层
pub fn top_level_stories(document: &XmlElement) -> Vec<&XmlElement> {
    let mut stories = Vec::new();
    collect_stories(document, &mut stories);
    stories
}

fn collect_stories<'a>(element: &'a XmlElement, out: &mut Vec<&'a XmlElement>) {
    let wraps_story = element.child_elements().any(|child| child.name == STORY);
    if element.name == STORY && !wraps_story {
        out.push(element);
        return;
    }
    for child in element.child_elements() {
        collect_stories(child, out);
    }
}

/// 从链接元素构造图片描述符
pub fn descriptor_from_link(link: &XmlElement) -> ImageDescriptor {
    let resource_uri = decode_resource_uri(link.attr(LINK_URI_ATTR).unwrap_or_default());
    let filename = resolve_filename(&resource_uri);
    let format = normalize_format(link.attr(LINK_FORMAT_ATTR), &filename);
    ImageDescriptor::new(resource_uri, filename, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapper_story_is_skipped() {
        let document = XmlElement::new(STORY)
            .with_child(XmlElement::new(STORY).with_attr("Self", "u1"))
            .with_child(XmlElement::new(STORY).with_attr("Self", "u2"));
        let stories = top_level_stories(&document);
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].attr("Self"), Some("u1"));
    }

    #[test]
    fn test_story_without_wrapper() {
        let document = XmlElement::new("Document")
            .with_child(XmlElement::new(STORY).with_child(XmlElement::new(CONTENT)));
        assert_eq!(top_level_stories(&document).len(), 1);
    }

    #[test]
    fn test_descriptor_from_link() {
        let link = XmlElement::new(LINK)
            .with_attr(LINK_URI_ATTR, "file:Links/Kansi%20kuva.JPG")
            .with_attr(LINK_FORMAT_ATTR, "$ID/JPEG");
        let descriptor = descriptor_from_link(&link);
        assert_eq!(descriptor.resource_uri, "file:Links/Kansi kuva.JPG");
        assert_eq!(descriptor.filename, "Kansi kuva.JPG");
        assert_eq!(descriptor.format, "jpeg");
        assert!(descriptor.alt_text.is_none());
    }
}
