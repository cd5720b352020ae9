//! Package Context - 排版包读取工具
//!
//! - zip 条目读写
//! - XML 元素树
//! - 资源 URI 处理

mod archive;
mod uri;
mod xml;

pub use archive::{PackageArchive, PackageWriter};
pub use uri::{
    decode_resource_uri, entry_name, media_type_for, normalize_format, percent_encode_segments,
    resolve_filename,
};
pub use xml::{parse_document, XmlElement, XmlNode};
