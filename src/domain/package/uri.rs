//! Resource URI helpers
//!
//! 链接资源 URI 的解码、文件名解析、条目名映射与格式规范化

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use unicode_normalization::UnicodeNormalization;

/// 路径段百分号编码时保留的字符（RFC 3986 unreserved）
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// 百分号解码后做 NFC 规范化
pub fn decode_resource_uri(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded.nfc().collect()
}

/// URI 的最后一段路径
pub fn resolve_filename(uri: &str) -> String {
    let trimmed = uri.trim_end_matches('/');
    match trimmed.rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => trimmed.to_string(),
    }
}

/// URI 映射为包内条目名：去掉 `file:` 前缀与前导斜杠
pub fn entry_name(uri: &str) -> String {
    let without_scheme = uri.strip_prefix("file:").unwrap_or(uri);
    without_scheme.trim_start_matches('/').to_string()
}

/// 每个 `/` 分隔的路径段分别做百分号编码
pub fn percent_encode_segments(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// 规范化图片格式
///
/// 取 `LinkResourceFormat` 的最后一段并小写；为空时退回文件扩展名
pub fn normalize_format(raw_format: Option<&str>, filename: &str) -> String {
    let from_attr = raw_format
        .map(|f| f.rsplit('/').next().unwrap_or(f).trim().to_ascii_lowercase())
        .filter(|f| !f.is_empty());

    let format = from_attr.unwrap_or_else(|| {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    });

    match format.as_str() {
        "jpg" => "jpeg".to_string(),
        "tif" => "tiff".to_string(),
        _ => format,
    }
}

/// EPUB manifest 使用的 media-type
pub fn media_type_for(format: &str) -> &'static str {
    match format {
        "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
