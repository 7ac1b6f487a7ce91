//! OCR 模块
//!
//! 面向扫描页的文字识别：图像预处理、引擎抽象（Tesseract CLI 实现）、
//! 以及把平铺词框聚成行/块的分组器。

use serde::{Deserialize, Serialize};

mod engine;
mod error;
mod group;
mod preprocess;
mod tesseract;

pub use engine::OcrEngine;
pub use error::OcrError;
pub use group::{group_words, Block, Line, BLOCK_THRESHOLD_PX, LINE_THRESHOLD_PX};
pub use preprocess::{prepare_for_ocr, PreprocessOptions};
pub use tesseract::{TesseractConfig, TesseractEngine};

/// 像素坐标系下的词框（原点在左上角）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl WordBox {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// OCR 识别出的单个词元
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrWord {
    /// 识别文本（可能为空或纯空白）
    pub text: String,
    /// 像素级词框
    pub bbox: WordBox,
    /// 引擎输出顺序编号
    pub source_index: usize,
}

/// OCR 审计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrAuditInfo {
    /// 引擎版本
    pub engine_version: Option<String>,
    /// 引擎参数（JSON 字符串）
    pub engine_params: Option<String>,
}
