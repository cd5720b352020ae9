//! Processing Context - Status & Results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 处理状态（用户可见的六种取值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    InProgress,
    AwaitingMetadata,
    AwaitingAltTexts,
    AwaitingLangMarkupReview,
    Ready,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::InProgress => "in_progress",
            ProcessingStatus::AwaitingMetadata => "awaiting_metadata",
            ProcessingStatus::AwaitingAltTexts => "awaiting_alt_texts",
            ProcessingStatus::AwaitingLangMarkupReview => "awaiting_lang_markup_review",
            ProcessingStatus::Ready => "ready",
            ProcessingStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(ProcessingStatus::InProgress),
            "awaiting_metadata" => Some(ProcessingStatus::AwaitingMetadata),
            "awaiting_alt_texts" => Some(ProcessingStatus::AwaitingAltTexts),
            "awaiting_lang_markup_review" => Some(ProcessingStatus::AwaitingLangMarkupReview),
            "ready" => Some(ProcessingStatus::Ready),
            "error" => Some(ProcessingStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Ready | ProcessingStatus::Error)
    }

    pub fn is_awaiting_review(&self) -> bool {
        self.review_kind().is_some()
    }

    pub fn review_kind(&self) -> Option<ReviewKind> {
        match self {
            ProcessingStatus::AwaitingMetadata => Some(ReviewKind::Metadata),
            ProcessingStatus::AwaitingAltTexts => Some(ReviewKind::AltTexts),
            ProcessingStatus::AwaitingLangMarkupReview => Some(ReviewKind::LangMarkup),
            _ => None,
        }
    }
}

/// 人工评审类型，每种对应一个待评审存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    Metadata,
    AltTexts,
    LangMarkup,
}

impl ReviewKind {
    pub const ALL: [ReviewKind; 3] = [
        ReviewKind::Metadata,
        ReviewKind::AltTexts,
        ReviewKind::LangMarkup,
    ];

    pub fn awaiting_status(&self) -> ProcessingStatus {
        match self {
            ReviewKind::Metadata => ProcessingStatus::AwaitingMetadata,
            ReviewKind::AltTexts => ProcessingStatus::AwaitingAltTexts,
            ReviewKind::LangMarkup => ProcessingStatus::AwaitingLangMarkupReview,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewKind::Metadata => "metadata",
            ReviewKind::AltTexts => "alt_texts",
            ReviewKind::LangMarkup => "lang_markup",
        }
    }
}

/// 暂停时携带的结构化细节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDetails {
    Metadata {
        missing_fields: Vec<String>,
        missing_images: Vec<String>,
    },
    AltTexts {
        /// 本次获得候选描述的文件名
        proposed: Vec<String>,
        /// 仍缺少描述的文件名
        unresolved: Vec<String>,
    },
    LangMarkup {
        flagged: usize,
    },
}

impl ReviewDetails {
    pub fn kind(&self) -> ReviewKind {
        match self {
            ReviewDetails::Metadata { .. } => ReviewKind::Metadata,
            ReviewDetails::AltTexts { .. } => ReviewKind::AltTexts,
            ReviewDetails::LangMarkup { .. } => ReviewKind::LangMarkup,
        }
    }
}

/// 终态记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ProcessedResult {
    pub fn ready(payload: Vec<u8>) -> Self {
        Self {
            status: ProcessingStatus::Ready,
            payload: Some(payload),
            error: None,
            completed_at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ProcessingStatus::Error,
            payload: None,
            error: Some(message.into()),
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            ProcessingStatus::InProgress,
            ProcessingStatus::AwaitingMetadata,
            ProcessingStatus::AwaitingAltTexts,
            ProcessingStatus::AwaitingLangMarkupReview,
            ProcessingStatus::Ready,
            ProcessingStatus::Error,
        ] {
            assert_eq!(ProcessingStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ProcessingStatus::from_str("paused"), None);
    }

    #[test]
    fn test_review_kind_maps_to_awaiting_status() {
        for kind in ReviewKind::ALL {
            assert_eq!(kind.awaiting_status().review_kind(), Some(kind));
        }
        assert!(!ProcessingStatus::Ready.is_awaiting_review());
        assert!(ProcessingStatus::Error.is_terminal());
    }
}
