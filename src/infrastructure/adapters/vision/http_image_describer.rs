//! HTTP Image Describer - 通过视觉模型生成替代文本
//!
//! 图片以 base64 data URL 形式随请求发送

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};

use crate::application::ports::{ImageDescriberPort, ProviderError};
use crate::infrastructure::adapters::chat::{
    ChatClient, ChatClientConfig, ChatMessage, ContentPart, ImageUrl, MessageContent,
};

const DEFAULT_PROMPT: &str = "Write a concise alternative text (one or two sentences) for this \
image, suitable for a screen reader. Answer with the alternative text only.";

/// 根据文件头判断 MIME 类型
fn sniff_mime(image: &[u8]) -> &'static str {
    match image {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ if image.starts_with(b"<svg") || image.starts_with(b"<?xml") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub fn data_url(image: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        sniff_mime(image),
        general_purpose::STANDARD.encode(image)
    )
}

/// HTTP 图片描述客户端
pub struct HttpImageDescriber {
    chat: ChatClient,
    prompt: String,
}

impl HttpImageDescriber {
    pub fn new(config: ChatClientConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            chat: ChatClient::new(config)?,
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl ImageDescriberPort for HttpImageDescriber {
    async fn describe_image(&self, image: &[u8]) -> Result<Option<String>, ProviderError> {
        if image.is_empty() {
            return Ok(None);
        }

        let message = ChatMessage::user(MessageContent::Parts(vec![
            ContentPart::Text {
                text: self.prompt.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: data_url(image),
                },
            },
        ]));

        let answer = self.chat.complete(&[message]).await?;
        tracing::debug!(
            model = %self.chat.model(),
            image_size = image.len(),
            described = answer.is_some(),
            "Image description completed"
        );
        Ok(answer)
    }

    async fn health_check(&self) -> bool {
        self.chat.health_check().await
    }
}
