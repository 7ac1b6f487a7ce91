//! OCR 引擎 trait 定义

use image::DynamicImage;

use crate::error::OcrError;
use crate::{OcrAuditInfo, OcrWord};

/// OCR 引擎统一 trait
///
/// 返回的词元按引擎输出顺序携带 `source_index`，空/纯空白词元一并
/// 返回，由调用方（分组器）过滤。
pub trait OcrEngine: Send {
    /// 识别图片中的词元及其像素级词框
    fn recognize_words(&mut self, img: &DynamicImage) -> Result<Vec<OcrWord>, OcrError>;

    /// 获取审计信息
    fn audit_info(&self) -> OcrAuditInfo;
}
