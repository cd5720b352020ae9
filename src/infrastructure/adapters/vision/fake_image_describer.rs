//! Fake Image Describer - 用于测试和离线运行
//!
//! 始终返回固定描述，不调用外部服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::application::ports::{ImageDescriberPort, ProviderError};

pub struct FakeImageDescriber {
    answer: Option<String>,
    calls: AtomicUsize,
}

impl FakeImageDescriber {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// 总是返回 None
    pub fn silent() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDescriberPort for FakeImageDescriber {
    async fn describe_image(&self, image: &[u8]) -> Result<Option<String>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(image_size = image.len(), "FakeImageDescriber: returning fixed answer");
        Ok(self.answer.clone())
    }
}
