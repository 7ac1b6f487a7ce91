//! PDF 访问层
//!
//! 两套互补的底层实现：
//! - pdfium：文本提取、精确文本搜索、页面渲染、图片页组装；
//! - lopdf：内容流级别的文字脱敏（字符置空 + 黑框覆盖）。

use serde::{Deserialize, Serialize};

mod document;
mod error;
mod geometry;
mod overlay;
mod provider;

pub use document::redact_text_layer;
pub use error::PdfError;
pub use geometry::page_bounds;
pub use provider::{PdfiumProvider, RasterPage};

/// 页面相对坐标系下的遮盖区域（0-1，原点在左上角）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaskRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// PDF 用户空间坐标系下的矩形（原点在左下角）
#[derive(Debug, Clone, Copy)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfRect {
    /// 检查文字边界框是否与遮盖区域相交（带容差边距）
    pub fn intersects_text_bbox(&self, text_x: f32, text_y: f32, text_w: f32, text_h: f32) -> bool {
        let margin: f32 = 5.0;
        let x_overlap =
            text_x < self.x + self.width + margin && text_x + text_w > self.x - margin;
        let y_overlap =
            text_y < self.y + self.height + margin && text_y + text_h > self.y - margin;
        x_overlap && y_overlap
    }
}
