//! 扫描页的黑框合成
//!
//! 在页面渲染图上直接涂黑命中的词框。输出图像替换原页面内容，
//! 底层像素被销毁，无法还原。

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use sable_ocr::WordBox;

/// 在图像上涂黑给定词框，返回新图像
///
/// 词框坐标与图像同为像素坐标；越界部分裁剪到图像边界。
pub fn blackout_words(img: &DynamicImage, boxes: &[WordBox]) -> DynamicImage {
    let mut image: RgbaImage = img.to_rgba8();
    let (img_width, img_height) = image.dimensions();
    let black = Rgba([0u8, 0u8, 0u8, 255u8]);

    for b in boxes {
        let x = (b.left.floor().max(0.0) as u32).min(img_width);
        let y = (b.top.floor().max(0.0) as u32).min(img_height);
        let w = (b.width.ceil().max(0.0) as u32).min(img_width - x);
        let h = (b.height.ceil().max(0.0) as u32).min(img_height - y);

        if w > 0 && h > 0 {
            let rect = Rect::at(x as i32, y as i32).of_size(w, h);
            draw_filled_rect_mut(&mut image, rect, black);
            log::debug!("[Compose] 涂黑: ({}, {}, {}, {})", x, y, w, h);
        }
    }

    DynamicImage::ImageRgba8(image)
}
