//! OCR 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR 引擎不可用: {0}")]
    EngineUnavailable(String),

    #[error("OCR 执行失败: {0}")]
    Execution(String),

    #[error("OCR 超时（{0} ms）")]
    Timeout(u64),

    #[error("图像处理失败: {0}")]
    ImageProcess(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
