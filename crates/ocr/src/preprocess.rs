//! 图像预处理模块
//!
//! 在送入 OCR 引擎前把渲染出的页面图像规整为二值图，
//! 固定流水线：灰度 → 自动对比度拉伸 → 高斯模糊去斑点 → 阈值二值化。
//! 纯确定性变换，无错误分支。

use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// 预处理配置
///
/// 各阶段可单独关闭（`blur_radius` 为 0 时跳过模糊），顺序固定。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreprocessOptions {
    /// 转单通道灰度
    pub grayscale: bool,
    /// 自动对比度拉伸（按最小/最大亮度线性映射到 0-255）
    pub autocontrast: bool,
    /// 高斯模糊半径
    pub blur_radius: f32,
    /// 二值化亮度阈值
    pub threshold: u8,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            grayscale: true,
            autocontrast: true,
            blur_radius: 1.0,
            threshold: 128,
        }
    }
}

/// 按配置执行预处理流水线，输出二值化的单通道图像
pub fn prepare_for_ocr(img: &DynamicImage, options: &PreprocessOptions) -> GrayImage {
    let mut working = if options.grayscale {
        DynamicImage::ImageLuma8(img.to_luma8())
    } else {
        img.clone()
    };

    if options.autocontrast {
        working = DynamicImage::ImageLuma8(stretch_contrast(&working.to_luma8()));
    }

    if options.blur_radius > 0.0 {
        working = working.blur(options.blur_radius);
    }

    binarize(&working.to_luma8(), options.threshold)
}

/// 线性拉伸：把观测到的亮度区间映射到整个 0-255 区间
fn stretch_contrast(img: &GrayImage) -> GrayImage {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    for pixel in img.pixels() {
        let v = pixel[0];
        min = min.min(v);
        max = max.max(v);
    }

    // 单一亮度的图像无可拉伸
    if min >= max {
        return img.clone();
    }

    let range = (max - min) as f32;
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = (((pixel[0] - min) as f32) * 255.0 / range).round() as u8;
    }
    out
}

/// 阈值二值化：低于阈值置 0，其余置 255
fn binarize(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] < threshold { 0 } else { 255 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gray_of(values: &[u8]) -> GrayImage {
        let mut img = GrayImage::new(values.len() as u32, 1);
        for (x, &v) in values.iter().enumerate() {
            img.put_pixel(x as u32, 0, Luma([v]));
        }
        img
    }

    #[test]
    fn test_binarize_two_levels_only() {
        let img = gray_of(&[0, 64, 127, 128, 200, 255]);
        let out = binarize(&img, 128);
        let values: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_stretch_contrast_full_range() {
        let img = gray_of(&[100, 150, 200]);
        let out = stretch_contrast(&img);
        let values: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 128, 255]);
    }

    #[test]
    fn test_stretch_contrast_flat_image_unchanged() {
        let img = gray_of(&[77, 77, 77]);
        let out = stretch_contrast(&img);
        assert_eq!(out, img);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let img = DynamicImage::ImageLuma8(gray_of(&[12, 90, 180, 240]));
        let options = PreprocessOptions::default();
        let a = prepare_for_ocr(&img, &options);
        let b = prepare_for_ocr(&img, &options);
        assert_eq!(a, b);
        assert!(a.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }
}
