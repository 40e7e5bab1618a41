use std::path::PathBuf;

use thiserror::Error;
use dxf2vec_engine::errors::EngineError;
use dxf2vec_io::IoError;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("没有可转换的 DXF 输入文件")]
    NoInputs,
    #[error("创建输出目录 {path:?} 失败: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法根据 {input:?} 推导输出文件名")]
    OutputPath { input: PathBuf },
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
