//! 页面几何：边界框解析与坐标转换

use lopdf::{Document, Object, Stream};

use crate::error::PdfError;
use crate::{MaskRegion, PdfRect};

/// 从 Object 获取数值
pub(crate) fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn box_values(arr: &[Object]) -> Option<(f32, f32, f32, f32)> {
    let values: Vec<f32> = arr.iter().filter_map(as_number).collect();
    if values.len() == 4 {
        Some((values[0], values[1], values[2], values[3]))
    } else {
        None
    }
}

/// 获取页面的有效边界框 (llx, lly, urx, ury)
///
/// 优先 CropBox（实际可见区域），其次 MediaBox，再尝试从父节点继承，
/// 都取不到时退回 Letter 尺寸。
pub fn page_bounds(doc: &Document, page_id: lopdf::ObjectId) -> (f32, f32, f32, f32) {
    let raw_box = if let Ok(Object::Dictionary(dict)) = doc.get_object(page_id) {
        if let Some(values) = dict
            .get(b"CropBox")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| box_values(arr))
        {
            Some(values)
        } else if let Some(values) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| box_values(arr))
        {
            Some(values)
        } else if let Ok(Object::Reference(parent_ref)) = dict.get(b"Parent") {
            doc.get_object(*parent_ref)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .and_then(|parent| parent.get(b"MediaBox").ok())
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| box_values(arr))
        } else {
            None
        }
    } else {
        None
    };

    raw_box.unwrap_or_else(|| {
        log::warn!("[Geometry] 页面缺少边界框，使用默认 Letter 尺寸");
        (0.0, 0.0, 612.0, 792.0)
    })
}

/// 把相对遮盖区域转换到 PDF 用户空间
///
/// 相对坐标原点在左上角、Y 轴向下；PDF 用户空间原点在左下角、Y 轴
/// 向上，因此 Y 方向要翻转。
pub fn to_user_space(regions: &[MaskRegion], bounds: (f32, f32, f32, f32)) -> Vec<PdfRect> {
    let (llx, lly, urx, ury) = bounds;
    let page_width = urx - llx;
    let page_height = ury - lly;

    regions
        .iter()
        .map(|m| {
            let rect = PdfRect {
                x: llx + (m.x as f32) * page_width,
                y: lly + (1.0 - m.y as f32 - m.height as f32) * page_height,
                width: (m.width as f32) * page_width,
                height: (m.height as f32) * page_height,
            };
            log::debug!(
                "[Geometry] 区域 ({:.4}, {:.4}, {:.4}, {:.4}) -> 用户空间 ({:.2}, {:.2}, {:.2}, {:.2})",
                m.x,
                m.y,
                m.width,
                m.height,
                rect.x,
                rect.y,
                rect.width,
                rect.height
            );
            rect
        })
        .collect()
}

fn stream_bytes(stream: &Stream) -> Vec<u8> {
    match stream.decompressed_content() {
        Ok(data) => data,
        Err(_) => stream.content.clone(),
    }
}

/// 获取页面的内容流数据（兼容引用、数组和内联流）
pub(crate) fn page_stream(doc: &Document, page_id: lopdf::ObjectId) -> Result<Vec<u8>, PdfError> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| PdfError::Malformed(e.to_string()))?;

    if let Object::Dictionary(dict) = page {
        if let Ok(contents) = dict.get(b"Contents") {
            match contents {
                Object::Reference(ref_id) => {
                    if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                        return Ok(stream_bytes(stream));
                    }
                }
                Object::Array(arr) => {
                    let mut all_content = Vec::new();
                    for item in arr {
                        if let Object::Reference(ref_id) = item {
                            if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                                all_content.extend(stream_bytes(stream));
                                all_content.push(b'\n');
                            }
                        }
                    }
                    return Ok(all_content);
                }
                Object::Stream(stream) => {
                    return Ok(stream_bytes(stream));
                }
                _ => {}
            }
        }
    }

    Err(PdfError::Malformed("无法获取页面内容流".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_user_space_flips_y() {
        // Letter 页面，顶部左上角 10% x 5% 的区域
        let regions = [MaskRegion {
            x: 0.0,
            y: 0.0,
            width: 0.1,
            height: 0.05,
        }];
        let rects = to_user_space(&regions, (0.0, 0.0, 612.0, 792.0));
        assert_eq!(rects.len(), 1);
        let r = &rects[0];
        assert!((r.x - 0.0).abs() < 1e-3);
        // 相对顶部的区域落在用户空间的页面上沿
        assert!((r.y - (792.0 - 39.6)).abs() < 1e-2);
        assert!((r.width - 61.2).abs() < 1e-3);
        assert!((r.height - 39.6).abs() < 1e-3);
    }

    #[test]
    fn test_to_user_space_respects_offset_origin() {
        let regions = [MaskRegion {
            x: 0.5,
            y: 0.5,
            width: 0.25,
            height: 0.25,
        }];
        let rects = to_user_space(&regions, (10.0, 20.0, 110.0, 220.0));
        let r = &rects[0];
        assert!((r.x - 60.0).abs() < 1e-3);
        assert!((r.y - 70.0).abs() < 1e-3);
        assert!((r.width - 25.0).abs() < 1e-3);
        assert!((r.height - 50.0).abs() < 1e-3);
    }
}
