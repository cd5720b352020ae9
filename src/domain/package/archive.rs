//! Package Archive - zip 条目读写

use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::document::DocumentError;

/// 只读排版包
pub struct PackageArchive<'a> {
    inner: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> PackageArchive<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, DocumentError> {
        let inner = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { inner })
    }

    /// 读取条目；条目不存在时返回 None
    pub fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, DocumentError> {
        match self.inner.by_name(name) {
            Ok(mut file) => {
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)?;
                Ok(Some(data))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取必需条目
    pub fn require_entry(&mut self, name: &str) -> Result<Vec<u8>, DocumentError> {
        self.read_entry(name)?
            .ok_or_else(|| DocumentError::MissingEntry(name.to_string()))
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.inner.file_names().map(str::to_string).collect()
    }
}

/// zip 写入器，供 EPUB 组装与测试构造排版包
pub struct PackageWriter {
    inner: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            inner: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// 不压缩写入（EPUB 的 mimetype 条目必须如此）
    pub fn add_stored(&mut self, name: &str, data: &[u8]) -> Result<(), DocumentError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.inner.start_file(name, options)?;
        self.inner.write_all(data)?;
        Ok(())
    }

    pub fn add_deflated(&mut self, name: &str, data: &[u8]) -> Result<(), DocumentError> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.inner.start_file(name, options)?;
        self.inner.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, DocumentError> {
        let cursor = self.inner.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_entries() {
        let mut writer = PackageWriter::new();
        writer.add_stored("mimetype", b"application/epub+zip").unwrap();
        writer.add_deflated("Stories/Story_u1.xml", b"<Story/>").unwrap();
        let bytes = writer.finish().unwrap();

        let mut archive = PackageArchive::open(&bytes).unwrap();
        assert_eq!(
            archive.read_entry("mimetype").unwrap().as_deref(),
            Some(&b"application/epub+zip"[..])
        );
        assert!(archive.read_entry("missing.xml").unwrap().is_none());
        assert!(matches!(
            archive.require_entry("missing.xml"),
            Err(DocumentError::MissingEntry(_))
        ));
        assert_eq!(archive.entry_names().len(), 2);
    }

    #[test]
    fn test_open_rejects_garbage() {
        let garbage = b"definitely not a zip archive";
        assert!(matches!(
            PackageArchive::open(garbage),
            Err(DocumentError::Archive(_))
        ));
    }
}
