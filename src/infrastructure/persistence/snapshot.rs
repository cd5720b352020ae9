//! Context Snapshot - 离线调试用的上下文快照
//!
//! bincode 编码，仅供排查问题，流水线不会读回

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::processing::{FileId, ProcessingContext};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// 快照文件路径：`<dir>/<file_id>.bin`
pub fn snapshot_path(dir: &Path, file_id: FileId) -> PathBuf {
    dir.join(format!("{}.bin", file_id))
}

pub fn write_snapshot(path: &Path, context: &ProcessingContext) -> Result<(), SnapshotError> {
    let bytes = bincode::serialize(context)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    tracing::debug!(file_id = %context.file_id, path = %path.display(), "Snapshot written");
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<ProcessingContext, SnapshotError> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::ChapterNode;
    use crate::domain::processing::{ReviewDetails, UploadSeed};
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_restores_parked_context() {
        let dir = tempdir().unwrap();
        let mut context = ProcessingContext::new(UploadSeed {
            original_filename: "kirja.idml".to_string(),
            content_type: "application/zip".to_string(),
            bytes: vec![0x50, 0x4b],
        });
        context.chapter_tree = vec![ChapterNode::story(vec![ChapterNode::text("Hei")])];
        context.set_metadata("title", "Kirja");
        context.review = Some(ReviewDetails::Metadata {
            missing_fields: vec!["creator".to_string()],
            missing_images: vec![],
        });

        let path = snapshot_path(&dir.path().join("nested"), context.file_id);
        write_snapshot(&path, &context).unwrap();
        assert_eq!(read_snapshot(&path).unwrap(), context);
    }

    #[test]
    fn test_missing_snapshot_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_snapshot(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
