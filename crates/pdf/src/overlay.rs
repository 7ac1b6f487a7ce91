//! 内容流级别的文字脱敏
//!
//! 两步配合使用：先把落在遮盖区域内的字符替换为空格（销毁可复制的
//! 文字内容），再在内容流末尾追加黑色矩形覆盖（处理编码字体等无法
//! 精确定位的情况）。

use lopdf::{
    content::{Content, Operation},
    Object,
};

use crate::error::PdfError;
use crate::geometry::as_number;
use crate::PdfRect;

/// 估算单个字符的宽度
fn glyph_width(byte: u8, font_size: f32) -> f32 {
    if byte < 128 {
        font_size * 0.55
    } else {
        font_size * 1.0
    }
}

/// 估算一段字节串的宽度
fn run_width(text: &[u8], font_size: f32) -> f32 {
    text.iter().map(|&b| glyph_width(b, font_size)).sum()
}

/// 字符级脱敏：将落在遮盖区域内的字符替换为空格
///
/// 空格既保持后续字符的排版位置不变，又没有可复制的内容。
fn blank_masked_glyphs(
    text: &[u8],
    start_x: f32,
    start_y: f32,
    font_size: f32,
    masks: &[PdfRect],
) -> (Vec<u8>, bool) {
    let glyph_height = font_size.abs().max(12.0);
    let mut result = Vec::with_capacity(text.len());
    let mut cursor_x = start_x;
    let mut any_blanked = false;

    for &byte in text {
        let width = glyph_width(byte, font_size);
        let covered = masks
            .iter()
            .any(|m| m.intersects_text_bbox(cursor_x, start_y, width, glyph_height));

        if covered {
            result.push(b' ');
            any_blanked = true;
        } else {
            result.push(byte);
        }
        cursor_x += width;
    }

    (result, any_blanked)
}

/// 文字定位状态机
///
/// 跟踪 CTM、文本矩阵与字号，足以把文字操作符的起笔点换算到
/// 用户空间。只处理平移/缩放为主的常见内容流，不做完整仿射展开。
struct TextCursor {
    ctm: [f32; 6],
    ctm_stack: Vec<[f32; 6]>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text: bool,
    font_size: f32,
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

impl TextCursor {
    fn new() -> Self {
        Self {
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text: false,
            font_size: 12.0,
        }
    }

    fn save(&mut self) {
        self.ctm_stack.push(self.ctm);
    }

    fn restore(&mut self) {
        if let Some(saved) = self.ctm_stack.pop() {
            self.ctm = saved;
        }
    }

    fn concat(&mut self, m: [f32; 6]) {
        let c = self.ctm;
        self.ctm = [
            c[0] * m[0] + c[2] * m[1],
            c[1] * m[0] + c[3] * m[1],
            c[0] * m[2] + c[2] * m[3],
            c[1] * m[2] + c[3] * m[3],
            c[0] * m[4] + c[2] * m[5] + c[4],
            c[1] * m[4] + c[3] * m[5] + c[5],
        ];
    }

    fn begin_text(&mut self) {
        self.in_text = true;
        self.text_matrix = IDENTITY;
        self.line_matrix = IDENTITY;
    }

    fn end_text(&mut self) {
        self.in_text = false;
    }

    fn set_text_matrix(&mut self, m: [f32; 6]) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix[4] += tx;
        self.line_matrix[5] += ty;
        self.text_matrix = self.line_matrix;
    }

    /// 当前文字起笔点的用户空间坐标
    fn origin(&self) -> (f32, f32) {
        let t = &self.text_matrix;
        let c = &self.ctm;
        (
            c[0] * t[4] + c[2] * t[5] + c[4],
            c[1] * t[4] + c[3] * t[5] + c[5],
        )
    }
}

fn matrix_operands(operands: &[Object]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0f32; 6];
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = as_number(&operands[i])?;
    }
    Some(m)
}

fn string_operand(obj: Option<&Object>) -> (Vec<u8>, lopdf::StringFormat) {
    if let Some(Object::String(s, fmt)) = obj {
        (s.clone(), *fmt)
    } else {
        (Vec::new(), lopdf::StringFormat::Literal)
    }
}

/// 扫描内容流，把遮盖区域内的文字字符置空
pub(crate) fn scrub_content_stream(
    content_data: &[u8],
    masks: &[PdfRect],
) -> Result<Vec<u8>, PdfError> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Malformed(e.to_string()))?;
    let mut ops: Vec<Operation> = Vec::with_capacity(content.operations.len());
    let mut cursor = TextCursor::new();

    for op in content.operations {
        match op.operator.as_str() {
            "q" => {
                cursor.save();
                ops.push(op);
            }
            "Q" => {
                cursor.restore();
                ops.push(op);
            }
            "cm" => {
                if let Some(m) = matrix_operands(&op.operands) {
                    cursor.concat(m);
                }
                ops.push(op);
            }
            "BT" => {
                cursor.begin_text();
                ops.push(op);
            }
            "ET" => {
                cursor.end_text();
                ops.push(op);
            }
            "Tm" if cursor.in_text => {
                if let Some(m) = matrix_operands(&op.operands) {
                    cursor.set_text_matrix(m);
                }
                ops.push(op);
            }
            "Td" | "TD" if cursor.in_text && op.operands.len() >= 2 => {
                if let (Some(tx), Some(ty)) =
                    (as_number(&op.operands[0]), as_number(&op.operands[1]))
                {
                    cursor.next_line(tx, ty);
                }
                ops.push(op);
            }
            "Tf" if op.operands.len() >= 2 => {
                if let Some(size) = as_number(&op.operands[1]) {
                    cursor.font_size = size.abs();
                }
                ops.push(op);
            }
            "Tj" if cursor.in_text => {
                let (x, y) = cursor.origin();
                let (bytes, fmt) = string_operand(op.operands.first());
                let (blanked, changed) =
                    blank_masked_glyphs(&bytes, x, y, cursor.font_size, masks);
                if changed {
                    log::debug!(
                        "[Overlay] Tj 置空: {:?}",
                        String::from_utf8_lossy(&bytes)
                    );
                    ops.push(Operation::new("Tj", vec![Object::String(blanked, fmt)]));
                } else {
                    ops.push(op);
                }
            }
            "TJ" if cursor.in_text => {
                let (mut cursor_x, y) = cursor.origin();
                let mut new_array: Vec<Object> = Vec::new();
                let mut changed = false;

                if let Some(Object::Array(arr)) = op.operands.first() {
                    for item in arr {
                        match item {
                            Object::String(s, fmt) => {
                                let (blanked, blanked_this) = blank_masked_glyphs(
                                    s,
                                    cursor_x,
                                    y,
                                    cursor.font_size,
                                    masks,
                                );
                                changed |= blanked_this;
                                cursor_x += run_width(s, cursor.font_size);
                                new_array.push(Object::String(blanked, *fmt));
                            }
                            Object::Integer(n) => {
                                cursor_x -= (*n as f32) / 1000.0 * cursor.font_size;
                                new_array.push(item.clone());
                            }
                            Object::Real(n) => {
                                cursor_x -= n / 1000.0 * cursor.font_size;
                                new_array.push(item.clone());
                            }
                            _ => new_array.push(item.clone()),
                        }
                    }
                }

                if changed {
                    ops.push(Operation::new("TJ", vec![Object::Array(new_array)]));
                } else {
                    ops.push(op);
                }
            }
            "'" if cursor.in_text => {
                let (x, y) = cursor.origin();
                let (bytes, fmt) = string_operand(op.operands.first());
                let (blanked, changed) =
                    blank_masked_glyphs(&bytes, x, y, cursor.font_size, masks);
                if changed {
                    ops.push(Operation::new("'", vec![Object::String(blanked, fmt)]));
                } else {
                    ops.push(op);
                }
            }
            "\"" if cursor.in_text && op.operands.len() >= 3 => {
                let (x, y) = cursor.origin();
                let (bytes, fmt) = string_operand(op.operands.get(2));
                let (blanked, changed) =
                    blank_masked_glyphs(&bytes, x, y, cursor.font_size, masks);
                if changed {
                    let mut operands = op.operands.clone();
                    operands[2] = Object::String(blanked, fmt);
                    ops.push(Operation::new("\"", operands));
                } else {
                    ops.push(op);
                }
            }
            _ => ops.push(op),
        }
    }

    Content { operations: ops }
        .encode()
        .map_err(|e| PdfError::Encode(e.to_string()))
}

/// 在内容流末尾追加黑色矩形覆盖
pub(crate) fn paint_black_boxes(
    content_data: &[u8],
    masks: &[PdfRect],
) -> Result<Vec<u8>, PdfError> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Malformed(e.to_string()))?;
    let mut ops = content.operations;

    ops.push(Operation::new("q", vec![]));
    // 填充与描边都置黑
    ops.push(Operation::new(
        "rg",
        vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
    ));
    ops.push(Operation::new(
        "RG",
        vec![Object::Real(0.0), Object::Real(0.0), Object::Real(0.0)],
    ));

    for rect in masks {
        log::debug!(
            "[Overlay] 黑框: x={:.2}, y={:.2}, w={:.2}, h={:.2}",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));

    Content { operations: ops }
        .encode()
        .map_err(|e| PdfError::Encode(e.to_string()))
}
