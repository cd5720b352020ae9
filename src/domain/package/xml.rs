//! XML Element Tree - 基于 quick-xml 的拥有型元素树
//!
//! 故事文档与清单都解析为此结构；名称与属性均按本地名（去掉命名空间前缀）保存。

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use crate::domain::document::DocumentError;

/// XML 节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// XML 元素
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XmlElement {
    /// 本地名
    pub name: String,
    /// (本地名, 值)，保持声明顺序
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// 所有后代文本的拼接
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// 前序查找所有指定本地名的后代元素（包括自身）
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.find_named(name, &mut found);
        found
    }

    fn find_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            found.push(self);
        }
        for child in self.child_elements() {
            child.find_named(name, found);
        }
    }
}

/// 解析 XML 字节为根元素
pub fn parse_document(bytes: &[u8]) -> Result<XmlElement, DocumentError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(64);
    let mut stack: Vec<XmlElement> = Vec::with_capacity(16);
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(element_from_start(&reader, &e)?);
            }
            Ok(Event::Empty(e)) => {
                let element = element_from_start(&reader, &e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| DocumentError::Xml("unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .decode()
                    .map_err(|err| DocumentError::Xml(format!("text decode: {:?}", err)))?;
                push_text(&mut stack, &text);
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| DocumentError::Xml(format!("cdata decode: {:?}", err)))?;
                push_text(&mut stack, &text);
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e
                    .decode()
                    .map_err(|err| DocumentError::Xml(format!("entity decode: {:?}", err)))?;
                let entity = format!("&{};", name);
                // 未知实体按原样保留
                match quick_xml::escape::unescape(&entity) {
                    Ok(resolved) => push_text(&mut stack, &resolved),
                    Err(_) => push_text(&mut stack, &entity),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Xml(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(DocumentError::Xml(format!(
            "unclosed element <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| DocumentError::Xml("document has no root element".to_string()))
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    start: &BytesStart<'_>,
) -> Result<XmlElement, DocumentError> {
    let name = reader
        .decoder()
        .decode(start.local_name().as_ref())
        .map_err(|err| DocumentError::Xml(format!("tag name decode: {:?}", err)))?
        .into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes().flatten() {
        let key = reader
            .decoder()
            .decode(attr.key.local_name().as_ref())
            .map_err(|err| DocumentError::Xml(format!("attribute name decode: {:?}", err)))?
            .into_owned();
        let raw = reader
            .decoder()
            .decode(attr.value.as_ref())
            .map_err(|err| DocumentError::Xml(format!("attribute decode: {:?}", err)))?;
        let value = quick_xml::escape::unescape(&raw)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| raw.into_owned());
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(XmlNode::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DocumentError::Xml(format!(
            "multiple root elements (second: <{}>)",
            element.name
        ))),
    }
}

fn push_text(stack: &mut [XmlElement], text: &str) {
    // 根元素之外的文本（空白）直接忽略
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if text.is_empty() {
        return;
    }
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
}
