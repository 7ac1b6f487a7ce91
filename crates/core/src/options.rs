//! 脱敏流水线配置

use serde::{Deserialize, Serialize};

use sable_ocr::{PreprocessOptions, TesseractConfig, BLOCK_THRESHOLD_PX, LINE_THRESHOLD_PX};

/// 单页 OCR 失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OcrFailurePolicy {
    /// 整个文档判为失败（默认：宁可失败也不输出漏脱敏的文档）
    #[default]
    FailDocument,
    /// 跳过该页，原样输出
    SkipPage,
}

/// 脱敏选项
///
/// 所有可调参数都显式集中在这里，不读任何环境变量。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RedactOptions {
    /// 行聚类阈值（像素）
    pub line_threshold_px: f32,
    /// 块聚类阈值（像素）
    pub block_threshold_px: f32,
    /// 扫描页 OCR 渲染 DPI
    pub ocr_dpi: u32,
    /// OCR 失败后降 DPI 重试一次，None 表示不重试
    pub ocr_retry_dpi: Option<u32>,
    /// 单页 OCR 失败策略
    pub ocr_failure: OcrFailurePolicy,
    /// 图像预处理配置
    pub preprocess: PreprocessOptions,
    /// Tesseract 配置
    pub tesseract: TesseractConfig,
}

impl Default for RedactOptions {
    fn default() -> Self {
        Self {
            line_threshold_px: LINE_THRESHOLD_PX,
            block_threshold_px: BLOCK_THRESHOLD_PX,
            ocr_dpi: 500,
            ocr_retry_dpi: Some(300),
            ocr_failure: OcrFailurePolicy::default(),
            preprocess: PreprocessOptions::default(),
            tesseract: TesseractConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RedactOptions::default();
        assert_eq!(options.line_threshold_px, 50.0);
        assert_eq!(options.block_threshold_px, 80.0);
        assert_eq!(options.ocr_dpi, 500);
        assert_eq!(options.ocr_retry_dpi, Some(300));
        assert_eq!(options.ocr_failure, OcrFailurePolicy::FailDocument);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let options: RedactOptions =
            serde_json::from_str(r#"{"ocrDpi": 300, "ocrFailure": "skip_page"}"#).unwrap();
        assert_eq!(options.ocr_dpi, 300);
        assert_eq!(options.ocr_failure, OcrFailurePolicy::SkipPage);
        assert_eq!(options.line_threshold_px, 50.0);
        assert_eq!(options.ocr_retry_dpi, Some(300));
    }
}
