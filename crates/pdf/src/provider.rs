//! pdfium 封装：文本提取、文本搜索、页面渲染与图片页组装

use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;

use crate::error::PdfError;
use crate::MaskRegion;

/// 获取 pdfium 库的搜索路径
fn pdfium_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            paths.push(exe_dir.join("libs"));
            paths.push(exe_dir.to_path_buf());
        }
    }

    paths.push(PathBuf::from("libs"));
    paths.push(PathBuf::from("./"));

    paths
}

/// 组装输出中的一页：脱敏后的页面图像及其原始页面尺寸（pt）
pub struct RasterPage {
    pub image: DynamicImage,
    pub width_pt: f32,
    pub height_pt: f32,
}

/// pdfium 访问入口
///
/// 持有已绑定的库实例，每次操作从字节重新打开文档，避免跨调用的
/// 生命周期纠缠。
pub struct PdfiumProvider {
    pdfium: Pdfium,
}

impl PdfiumProvider {
    /// 绑定 pdfium 库（先尝试各候选路径，最后回退到系统库）
    pub fn new() -> Result<Self, PdfError> {
        for path in pdfium_search_paths() {
            let lib_path = Pdfium::pdfium_platform_library_name_at_path(&path);
            log::debug!("[Pdfium] 尝试加载: {:?}", lib_path);
            if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
                log::info!("[Pdfium] 成功从 {:?} 加载", path);
                return Ok(Self {
                    pdfium: Pdfium::new(bindings),
                });
            }
        }

        Pdfium::bind_to_system_library()
            .map(|bindings| Self {
                pdfium: Pdfium::new(bindings),
            })
            .map_err(|e| PdfError::PdfiumUnavailable(e.to_string()))
    }

    fn load<'a>(&'a self, pdf_bytes: &'a [u8]) -> Result<PdfDocument<'a>, PdfError> {
        self.pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| PdfError::Malformed(e.to_string()))
    }

    /// 页数
    pub fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, PdfError> {
        Ok(self.load(pdf_bytes)?.pages().len() as usize)
    }

    /// 按页提取文本（空页返回空字符串）
    pub fn extract_page_texts(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, PdfError> {
        let document = self.load(pdf_bytes)?;
        let mut results = Vec::new();

        for page_idx in 0..document.pages().len() {
            let page = document
                .pages()
                .get(page_idx)
                .map_err(|e| PdfError::Malformed(e.to_string()))?;
            let text = page
                .text()
                .map_err(|e| PdfError::Malformed(e.to_string()))?;
            results.push(text.all());
        }

        Ok(results)
    }

    /// 在指定页面批量搜索多个文本，返回页面相对坐标的遮盖区域
    ///
    /// 一次打开文档搜完全部词条。区域外扩一圈小边距，保证黑框完整
    /// 盖住字形。
    pub fn search_in_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        search_terms: &[&str],
    ) -> Result<Vec<MaskRegion>, PdfError> {
        let document = self.load(pdf_bytes)?;
        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|_| PdfError::PageOutOfRange(page_index))?;

        let page_width = page.width().value as f64;
        let page_height = page.height().value as f64;

        let text = page
            .text()
            .map_err(|e| PdfError::Malformed(e.to_string()))?;
        let search_options = PdfSearchOptions::new();

        let mut regions = Vec::new();

        for term in search_terms {
            let search = match text.search(term, &search_options) {
                Ok(s) => s,
                Err(_) => continue,
            };

            for segments in search.iter(PdfSearchDirection::SearchForward) {
                for segment in segments.iter() {
                    let bounds = segment.bounds();

                    let pdf_left = bounds.left().value as f64;
                    let pdf_bottom = bounds.bottom().value as f64;
                    let pdf_right = bounds.right().value as f64;
                    let pdf_top = bounds.top().value as f64;

                    let x = pdf_left / page_width;
                    let y = 1.0 - (pdf_top / page_height);
                    let width = (pdf_right - pdf_left) / page_width;
                    let height = (pdf_top - pdf_bottom) / page_height;

                    let padding = 0.003;
                    regions.push(MaskRegion {
                        x: (x - padding).max(0.0),
                        y: (y - padding).max(0.0),
                        width: (width + padding * 2.0).min(1.0),
                        height: (height + padding * 2.0).min(1.0),
                    });
                }
            }
        }

        log::info!(
            "[Pdfium] 页面 {} 搜索 {} 个词条，命中 {} 处",
            page_index,
            search_terms.len(),
            regions.len()
        );

        Ok(regions)
    }

    /// 渲染指定页面为图像，并返回页面原始尺寸（pt）
    pub fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_index: usize,
        dpi: u32,
    ) -> Result<RasterPage, PdfError> {
        let document = self.load(pdf_bytes)?;
        let page = document
            .pages()
            .get(page_index as u16)
            .map_err(|_| PdfError::PageOutOfRange(page_index))?;

        let page_width = page.width().value;
        let page_height = page.height().value;

        // PDF 原生 72 DPI
        let scale = dpi as f32 / 72.0;
        let target_width = (page_width * scale) as i32;
        let target_height = (page_height * scale) as i32;

        log::info!(
            "[Pdfium] 渲染页面 {}: {}x{} pt -> {}x{} px (DPI: {})",
            page_index,
            page_width,
            page_height,
            target_width,
            target_height,
            dpi
        );

        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width)
            .set_target_height(target_height);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| PdfError::Render(e.to_string()))?;

        Ok(RasterPage {
            image: bitmap.as_image(),
            width_pt: page_width,
            height_pt: page_height,
        })
    }

    /// 把一组页面图像组装成新的 PDF，返回字节
    ///
    /// 每页图像以 JPEG 形式嵌入，并缩放到原页面尺寸。
    pub fn assemble_raster_document(&self, pages: &[RasterPage]) -> Result<Vec<u8>, PdfError> {
        let mut new_doc = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| PdfError::Assemble(e.to_string()))?;

        let temp_dir = std::env::temp_dir();

        for (idx, raster) in pages.iter().enumerate() {
            let mut new_page = new_doc
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(
                    PdfPoints::new(raster.width_pt),
                    PdfPoints::new(raster.height_pt),
                ))
                .map_err(|e| PdfError::Assemble(e.to_string()))?;

            let temp_path = temp_dir.join(format!("sable_page_{}_{}.jpg", std::process::id(), idx));
            raster
                .image
                .to_rgb8()
                .save_with_format(&temp_path, image::ImageFormat::Jpeg)
                .map_err(|e| PdfError::Assemble(format!("保存临时图片失败: {}", e)))?;

            let result = PdfPageImageObject::new_from_jpeg_file(&new_doc, &temp_path)
                .map_err(|e| PdfError::Assemble(e.to_string()))
                .and_then(|mut image_obj| {
                    image_obj
                        .scale(raster.width_pt, raster.height_pt)
                        .map_err(|e| PdfError::Assemble(e.to_string()))?;
                    new_page
                        .objects_mut()
                        .add_image_object(image_obj)
                        .map_err(|e| PdfError::Assemble(e.to_string()))?;
                    Ok(())
                });

            let _ = std::fs::remove_file(&temp_path);
            result?;

            log::info!("[Pdfium] 组装页面 {} 完成", idx);
        }

        new_doc
            .save_to_bytes()
            .map_err(|e| PdfError::Assemble(e.to_string()))
    }
}
