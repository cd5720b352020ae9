//! HTTP Language Detector - 让语言模型找出非主语言的词句
//!
//! 返回模型的原始回答，JSON 解析与容错由流水线完成

use async_trait::async_trait;

use crate::application::ports::{LanguageDetectorPort, ProviderError};
use crate::infrastructure::adapters::chat::{
    ChatClient, ChatClientConfig, ChatMessage, MessageContent,
};

const SYSTEM_PROMPT: &str = "You find words and phrases that are not written in the main \
language of a text. Answer with a JSON object of the form {\"words\": [\"...\"]} listing each \
such word or phrase exactly as it appears in the text. Answer {\"words\": []} if there are none.";

fn user_prompt(text: &str, main_language: &str) -> String {
    format!("Main language: {}\n\nText:\n{}", main_language, text)
}

/// HTTP 语言检测客户端
pub struct HttpLanguageDetector {
    chat: ChatClient,
}

impl HttpLanguageDetector {
    pub fn new(config: ChatClientConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            chat: ChatClient::new(config)?,
        })
    }
}

#[async_trait]
impl LanguageDetectorPort for HttpLanguageDetector {
    async fn detect_non_main_language_words(
        &self,
        text: &str,
        main_language: &str,
    ) -> Result<Option<String>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(MessageContent::Text(user_prompt(text, main_language))),
        ];
        let answer = self.chat.complete(&messages).await?;

        tracing::debug!(
            model = %self.chat.model(),
            text_len = text.len(),
            main_language = %main_language,
            answered = answer.is_some(),
            "Language detection completed"
        );
        Ok(answer)
    }

    async fn health_check(&self) -> bool {
        self.chat.health_check().await
    }
}
