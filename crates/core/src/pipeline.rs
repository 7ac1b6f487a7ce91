//! 文档脱敏流水线
//!
//! 逐页处理：有文字层的页面走内容流脱敏（字符置空 + 黑框），
//! 扫描页走 渲染 → 预处理 → OCR → 分组 → 解析 → 涂黑。
//! 只要文档中存在扫描页，输出就整体退化为栅格文档，只保留处理过
//! 的扫描页图像，避免文字页把未处理的敏感内容带出去。

use std::collections::BTreeMap;

use image::DynamicImage;

use sable_ocr::{group_words, prepare_for_ocr, OcrEngine, OcrError, OcrWord, TesseractEngine};
use sable_pdf::{redact_text_layer, MaskRegion, PdfiumProvider, RasterPage};
use sable_rules::RuleSet;

use crate::compose::blackout_words;
use crate::error::RedactError;
use crate::options::{OcrFailurePolicy, RedactOptions};
use crate::resolve::{resolve_scanned_boxes, unique_match_texts};

/// 页面类别
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageKind {
    /// 有可提取文字层
    TextLayer,
    /// 无文字层，按扫描件处理
    Scanned,
}

/// 按提取文本判断页面类别
pub fn classify_page(extracted_text: &str) -> PageKind {
    if extracted_text.trim().is_empty() {
        PageKind::Scanned
    } else {
        PageKind::TextLayer
    }
}

/// 文档脱敏器
///
/// 文字页与扫描页使用不同的规则表：扫描页规则带更宽的姓名触发词
/// 集合，补偿 OCR 文本噪声。OCR 引擎按需初始化，纯文字文档不要求
/// 装有 tesseract。
pub struct Redactor {
    options: RedactOptions,
    text_rules: RuleSet,
    scanned_rules: RuleSet,
    engine: Option<Box<dyn OcrEngine>>,
}

impl Redactor {
    pub fn new(options: RedactOptions) -> Self {
        Self {
            options,
            text_rules: RuleSet::text_layer(),
            scanned_rules: RuleSet::scanned(),
            engine: None,
        }
    }

    /// 使用自定义 OCR 引擎（默认按需创建 Tesseract）
    pub fn with_engine(options: RedactOptions, engine: Box<dyn OcrEngine>) -> Self {
        Self {
            engine: Some(engine),
            ..Self::new(options)
        }
    }

    /// 使用自定义规则表
    pub fn with_rules(options: RedactOptions, text_rules: RuleSet, scanned_rules: RuleSet) -> Self {
        Self {
            text_rules,
            scanned_rules,
            ..Self::new(options)
        }
    }

    pub fn options(&self) -> &RedactOptions {
        &self.options
    }

    /// 对整个文档脱敏，返回新的 PDF 字节
    pub fn redact_document(&mut self, pdf_bytes: &[u8]) -> Result<Vec<u8>, RedactError> {
        let provider = PdfiumProvider::new()?;
        let page_texts = provider.extract_page_texts(pdf_bytes)?;

        let mut masks_by_page: BTreeMap<usize, Vec<MaskRegion>> = BTreeMap::new();
        let mut raster_pages: Vec<RasterPage> = Vec::new();
        let mut any_scanned = false;

        for (page_idx, text) in page_texts.iter().enumerate() {
            match classify_page(text) {
                PageKind::TextLayer => {
                    let matches = self.text_rules.find_matches(text);
                    log::info!(
                        "[Pipeline] 页面 {} 文字层命中 {} 处",
                        page_idx,
                        matches.len()
                    );
                    if matches.is_empty() {
                        continue;
                    }

                    let terms = unique_match_texts(&matches);
                    let term_refs: Vec<&str> = terms.iter().map(String::as_str).collect();
                    let regions = provider.search_in_page(pdf_bytes, page_idx, &term_refs)?;
                    if !regions.is_empty() {
                        masks_by_page.insert(page_idx, regions);
                    }
                }
                PageKind::Scanned => {
                    any_scanned = true;
                    match self.redact_scanned_page(&provider, pdf_bytes, page_idx) {
                        Ok(raster) => raster_pages.push(raster),
                        Err(RedactError::Ocr(e))
                            if self.options.ocr_failure == OcrFailurePolicy::SkipPage =>
                        {
                            log::warn!(
                                "[Pipeline] 页面 {} OCR 失败，按策略原样输出（可能含未脱敏内容）: {}",
                                page_idx,
                                e
                            );
                            let raster =
                                provider.render_page(pdf_bytes, page_idx, self.options.ocr_dpi)?;
                            raster_pages.push(raster);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        if any_scanned {
            // 混合文档整体退化为栅格输出，文字页不进入结果
            log::info!(
                "[Pipeline] 检测到扫描页，输出 {} 页栅格文档",
                raster_pages.len()
            );
            return Ok(provider.assemble_raster_document(&raster_pages)?);
        }

        Ok(redact_text_layer(pdf_bytes, &masks_by_page)?)
    }

    /// 处理单个扫描页：渲染、识别、解析词框并涂黑
    fn redact_scanned_page(
        &mut self,
        provider: &PdfiumProvider,
        pdf_bytes: &[u8],
        page_idx: usize,
    ) -> Result<RasterPage, RedactError> {
        let raster = provider.render_page(pdf_bytes, page_idx, self.options.ocr_dpi)?;

        let words = match self.recognize(&raster.image) {
            Ok(words) => words,
            Err(e) => {
                let retry_dpi = match self.options.ocr_retry_dpi {
                    Some(dpi) => dpi,
                    None => return Err(e.into()),
                };
                log::warn!(
                    "[Pipeline] 页面 {} OCR 失败（{}），降到 {} DPI 重试",
                    page_idx,
                    e,
                    retry_dpi
                );
                // 词框坐标跟随识别用的渲染，重试后黑框也画在低 DPI 图上
                let retry = provider.render_page(pdf_bytes, page_idx, retry_dpi)?;
                let words = self.recognize(&retry.image)?;
                return Ok(self.blackout(retry, words));
            }
        };

        Ok(self.blackout(raster, words))
    }

    fn recognize(&mut self, img: &DynamicImage) -> Result<Vec<OcrWord>, OcrError> {
        if self.engine.is_none() {
            let engine = TesseractEngine::new(self.options.tesseract.clone())?;
            log::info!("[Pipeline] OCR 引擎就绪: {:?}", engine.audit_info());
            self.engine = Some(Box::new(engine));
        }

        let prepared = prepare_for_ocr(img, &self.options.preprocess);
        match self.engine.as_mut() {
            Some(engine) => engine.recognize_words(&DynamicImage::ImageLuma8(prepared)),
            None => Err(OcrError::EngineUnavailable("引擎未初始化".to_string())),
        }
    }

    fn blackout(&self, raster: RasterPage, words: Vec<OcrWord>) -> RasterPage {
        let blocks = group_words(
            words,
            self.options.line_threshold_px,
            self.options.block_threshold_px,
        );
        let boxes = resolve_scanned_boxes(&blocks, &self.scanned_rules);

        RasterPage {
            image: blackout_words(&raster.image, &boxes),
            width_pt: raster.width_pt,
            height_pt: raster.height_pt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_ocr::{OcrAuditInfo, WordBox};

    #[test]
    fn test_classify_by_extracted_text() {
        assert_eq!(classify_page("Hello world"), PageKind::TextLayer);
        assert_eq!(classify_page(""), PageKind::Scanned);
        assert_eq!(classify_page("   \n\t  "), PageKind::Scanned);
    }

    #[test]
    fn test_redactor_carries_options() {
        let mut options = RedactOptions::default();
        options.ocr_dpi = 400;
        let redactor = Redactor::new(options);
        assert_eq!(redactor.options().ocr_dpi, 400);
    }

    struct FakeEngine;

    impl OcrEngine for FakeEngine {
        fn recognize_words(&mut self, _img: &DynamicImage) -> Result<Vec<OcrWord>, OcrError> {
            Ok(vec![OcrWord {
                text: "john@example.com".to_string(),
                bbox: WordBox {
                    left: 10.0,
                    top: 10.0,
                    width: 80.0,
                    height: 20.0,
                },
                source_index: 0,
            }])
        }

        fn audit_info(&self) -> OcrAuditInfo {
            OcrAuditInfo {
                engine_version: Some("fake".to_string()),
                engine_params: None,
            }
        }
    }

    #[test]
    fn test_injected_engine_used_for_recognition() {
        let mut redactor = Redactor::with_engine(RedactOptions::default(), Box::new(FakeEngine));
        let img = DynamicImage::new_rgba8(100, 40);
        let words = redactor.recognize(&img).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "john@example.com");
    }
}
