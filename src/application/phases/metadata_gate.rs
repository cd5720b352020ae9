//! Metadata Gate - 必填元数据与图片内容检查

use async_trait::async_trait;

use crate::application::ports::{Phase, PhaseOutcome, PipelinePhase};
use crate::domain::processing::{metadata_keys, ProcessingContext, ReviewDetails};

/// 缺失项；全部齐全时返回 None
///
/// 缺失的图片按文件名去重，保持首次出现的顺序
pub fn find_missing(context: &ProcessingContext) -> Option<ReviewDetails> {
    let missing_fields: Vec<String> = metadata_keys::REQUIRED
        .iter()
        .filter(|key| context.metadata_value(key).is_none())
        .map(|key| key.to_string())
        .collect();

    let mut missing_images: Vec<String> = Vec::new();
    for image in &context.images {
        if !context.has_image_content(&image.filename) && !missing_images.contains(&image.filename)
        {
            missing_images.push(image.filename.clone());
        }
    }

    if missing_fields.is_empty() && missing_images.is_empty() {
        None
    } else {
        Some(ReviewDetails::Metadata {
            missing_fields,
            missing_images,
        })
    }
}

/// 阶段五：元数据门禁
///
/// 元数据补全后也从这里重新进入
pub struct MetadataGatePhase;

#[async_trait]
impl PipelinePhase for MetadataGatePhase {
    fn phase(&self) -> Phase {
        Phase::MetadataGate
    }

    async fn run(&self, context: ProcessingContext) -> PhaseOutcome {
        match find_missing(&context) {
            Some(details) => {
                tracing::info!(
                    file_id = %context.file_id,
                    details = ?details,
                    "Mandatory data missing, awaiting metadata"
                );
                PhaseOutcome::suspend(context, details)
            }
            None => PhaseOutcome::proceed(context),
        }
    }
}
