//! 语言片段分割器
//!
//! 根据检测器返回的外语短语，把一段文本切分为主语言片段与待标记片段。
//! 输出片段按顺序拼接必须与输入完全相同。

use serde_json::Value;
use std::ops::Range;

/// 待人工确认的语言代码
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// 检测器响应中可识别的短语列表键
pub const PHRASE_KEYS: &[&str] = &["words", "phrases", "foreign_words", "non_main_language_words"];

/// 相邻区间之间允许合并的最大间隔（字符数）
pub const MAX_MERGE_GAP_CHARS: usize = 1;

/// 分割结果片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSegment {
    pub text: String,
    /// true 表示非主语言片段
    pub flagged: bool,
}

/// 去掉可选的 Markdown 代码围栏
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // 跳过语言标记（```json），有无换行都可
    let body = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        .trim_start();
    body.trim_end().trim_end_matches("```").trim()
}

/// 解析检测器响应为短语列表
///
/// 无法解析、键不存在或列表为空时返回空列表（即不分割）
pub fn parse_phrase_list(response: &str) -> Vec<String> {
    let body = strip_code_fence(response);
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let list = match &value {
        Value::Object(map) => PHRASE_KEYS.iter().find_map(|key| map.get(*key)),
        Value::Array(_) => Some(&value),
        _ => None,
    };

    list.and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|phrase| !phrase.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 逐个短语顺序向前扫描，收集全部出现位置（字节区间）
pub fn find_phrase_ranges(text: &str, phrases: &[String]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    for phrase in phrases {
        if phrase.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(pos) = text[from..].find(phrase.as_str()) {
            let start = from + pos;
            let end = start + phrase.len();
            ranges.push(start..end);
            from = end;
        }
    }
    ranges
}

/// 合并重叠或间隔不超过一个字符的区间
pub fn merge_ranges(text: &str, mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if let Some(last) = merged.last_mut() {
            let close_enough = range.start <= last.end
                || text[last.end..range.start].chars().count() <= MAX_MERGE_GAP_CHARS;
            if close_enough {
                last.end = last.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}

/// 按短语切分文本
///
/// 返回有序、无重叠、无空隙且覆盖整段文本的非空片段序列
pub fn split_by_phrases(text: &str, phrases: &[String]) -> Vec<LanguageSegment> {
    let ranges = merge_ranges(text, find_phrase_ranges(text, phrases));

    let mut segments = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut cursor = 0;
    for range in ranges {
        if range.start > cursor {
            segments.push(LanguageSegment {
                text: text[cursor..range.start].to_string(),
                flagged: false,
            });
        }
        segments.push(LanguageSegment {
            text: text[range.clone()].to_string(),
            flagged: true,
        });
        cursor = range.end;
    }
    if cursor < text.len() {
        segments.push(LanguageSegment {
            text: text[cursor..].to_string(),
            flagged: false,
        });
    }

    segments.retain(|segment| !segment.text.is_empty());
    segments
}
