//! 文字型页面的文档级脱敏

use std::collections::BTreeMap;

use lopdf::{Document, Object, Stream};

use crate::error::PdfError;
use crate::geometry::{page_bounds, page_stream, to_user_space};
use crate::overlay::{paint_black_boxes, scrub_content_stream};
use crate::MaskRegion;

/// 对文档中指定页面应用文字脱敏，返回新的 PDF 字节
///
/// 每个带遮盖区域的页面做两步处理：内容流字符置空 + 黑框覆盖，
/// 其余页面保持原样。
pub fn redact_text_layer(
    pdf_bytes: &[u8],
    masks_by_page: &BTreeMap<usize, Vec<MaskRegion>>,
) -> Result<Vec<u8>, PdfError> {
    let mut doc =
        Document::load_mem(pdf_bytes).map_err(|e| PdfError::Malformed(e.to_string()))?;

    let page_ids: Vec<lopdf::ObjectId> = doc.page_iter().collect();

    for (page_idx, page_id) in page_ids.iter().enumerate() {
        let masks = match masks_by_page.get(&page_idx) {
            Some(masks) if !masks.is_empty() => masks,
            _ => continue,
        };

        let bounds = page_bounds(&doc, *page_id);
        let rects = to_user_space(masks, bounds);
        let content_data = page_stream(&doc, *page_id)?;

        let scrubbed = scrub_content_stream(&content_data, &rects)?;
        let painted = paint_black_boxes(&scrubbed, &rects)?;

        let stream = Stream::new(lopdf::Dictionary::new(), painted);
        let stream_id = doc.add_object(stream);
        if let Ok(Object::Dictionary(ref mut dict)) = doc.get_object_mut(*page_id) {
            dict.set(b"Contents", Object::Reference(stream_id));
        }

        log::info!("[TextRedact] 页面 {} 应用 {} 个遮盖区域", page_idx, masks.len());
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Encode(e.to_string()))?;
    Ok(out)
}
