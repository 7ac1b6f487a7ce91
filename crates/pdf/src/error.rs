//! PDF 层错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("文档损坏或无法解析: {0}")]
    Malformed(String),

    #[error("Pdfium 库不可用: {0}")]
    PdfiumUnavailable(String),

    #[error("页面 {0} 不存在")]
    PageOutOfRange(usize),

    #[error("渲染失败: {0}")]
    Render(String),

    #[error("内容流编码失败: {0}")]
    Encode(String),

    #[error("文档组装失败: {0}")]
    Assemble(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
