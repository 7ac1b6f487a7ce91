//! 流水线错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedactError {
    #[error("文档损坏或无法解析: {0}")]
    MalformedDocument(String),

    #[error("OCR 失败: {0}")]
    Ocr(#[from] sable_ocr::OcrError),

    #[error("PDF 处理失败: {0}")]
    Pdf(sable_pdf::PdfError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sable_pdf::PdfError> for RedactError {
    fn from(e: sable_pdf::PdfError) -> Self {
        // 文档级解析失败单独归类，调用方据此区分坏文件与环境问题
        match e {
            sable_pdf::PdfError::Malformed(msg) => RedactError::MalformedDocument(msg),
            other => RedactError::Pdf(other),
        }
    }
}
