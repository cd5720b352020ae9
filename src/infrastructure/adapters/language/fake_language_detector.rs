//! Fake Language Detector - 用于测试和离线运行
//!
//! 从固定词表里挑出出现在文本中的词，按 `{"words": [...]}` 格式返回

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::application::ports::{LanguageDetectorPort, ProviderError};

pub struct FakeLanguageDetector {
    foreign_words: Vec<String>,
    calls: AtomicUsize,
}

impl FakeLanguageDetector {
    pub fn new<I, S>(foreign_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            foreign_words: foreign_words.into_iter().map(Into::into).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// 从不标记任何内容
    pub fn silent() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageDetectorPort for FakeLanguageDetector {
    async fn detect_non_main_language_words(
        &self,
        text: &str,
        _main_language: &str,
    ) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let found: Vec<&str> = self
            .foreign_words
            .iter()
            .map(String::as_str)
            .filter(|word| !word.is_empty() && text.contains(*word))
            .collect();
        if found.is_empty() {
            return Ok(None);
        }

        let body = serde_json::json!({ "words": found });
        Ok(Some(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_only_present_words() {
        let detector = FakeLanguageDetector::new(["hello", "bonjour"]);
        let answer = detector
            .detect_non_main_language_words("Tämä on hello world", "fi")
            .await
            .unwrap();
        assert_eq!(answer.as_deref(), Some(r#"{"words":["hello"]}"#));
        assert_eq!(
            detector
                .detect_non_main_language_words("Ei mitään", "fi")
                .await
                .unwrap(),
            None
        );
        assert_eq!(detector.call_count(), 2);
    }
}
