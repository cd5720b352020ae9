//! Submit Handler - 新排版包进入流水线

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::commands::publish_commands::{SubmitPackage, SubmitPackageResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::PipelineRunnerPort;
use crate::domain::processing::{metadata_keys, ProcessingContext, UploadSeed};

/// SubmitPackage Handler
pub struct SubmitPackageHandler {
    runner: Arc<dyn PipelineRunnerPort>,
    default_metadata: BTreeMap<String, String>,
}

impl SubmitPackageHandler {
    pub fn new(
        runner: Arc<dyn PipelineRunnerPort>,
        default_metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            runner,
            default_metadata,
        }
    }

    pub async fn handle(&self, cmd: SubmitPackage) -> Result<SubmitPackageResponse, ApplicationError> {
        if cmd.bytes.is_empty() {
            return Err(ApplicationError::validation("package is empty"));
        }
        if let Some(key) = cmd
            .metadata
            .keys()
            .find(|key| key.starts_with(metadata_keys::BOOKKEEPING_PREFIX))
        {
            return Err(ApplicationError::validation(format!(
                "metadata key '{}' is reserved",
                key
            )));
        }

        let mut context = ProcessingContext::new(UploadSeed {
            original_filename: cmd.original_filename,
            content_type: cmd.content_type,
            bytes: cmd.bytes,
        });
        context.metadata = self.default_metadata.clone();
        context.metadata.extend(cmd.metadata);

        let file_id = self.runner.submit(context).await?;
        tracing::info!(file_id = %file_id, "Package submitted");

        Ok(SubmitPackageResponse { file_id })
    }
}
