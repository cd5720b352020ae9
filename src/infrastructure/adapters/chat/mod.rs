//! OpenAI 兼容的对话接口

mod client;

pub use client::{
    ChatClient, ChatClientConfig, ChatMessage, ContentPart, ImageUrl, MessageContent,
};
