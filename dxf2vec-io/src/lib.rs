mod dxf;
pub mod vec;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use dxf2vec_core::document::Document;

pub use vec::{VecFile, VecReader, VecWriter};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

/// 源图纸加载入口；批处理只依赖该 trait，便于替换或在测试中模拟。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

/// `.vec` 输出的写入入口。
pub trait VecSaver {
    fn save(&self, file: &VecFile, path: &Path) -> Result<(), IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 直接从内存中的 DXF 文本构建文档。
    pub fn parse_str(&self, source: &str) -> Result<Document, IoError> {
        dxf::DxfParser::new(source)
            .parse()
            .map_err(|err| IoError::InvalidDocument(err.to_string()))
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let bytes = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        // 老版本 DXF 常见 ANSI 编码，非 UTF-8 字节按替换字符处理。
        let data = String::from_utf8_lossy(&bytes);
        let document = self.parse_str(&data)?;
        debug!(
            path = %path.display(),
            entities = document.entities().count(),
            blocks = document.blocks().count(),
            unit = document.unit().name(),
            "DXF 解析完成"
        );
        Ok(document)
    }
}
