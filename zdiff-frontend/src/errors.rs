use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] zdiff_io::IoError),
    #[error(transparent)]
    Compare(#[from] zdiff_engine::errors::ConfigError),
    #[error("序列化报告失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("读取目录 {path:?} 失败: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("写入报告文件 {path:?} 失败: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
