//! 双路文字恢复：内容流原始文字 + OCR
//!
//! 两路结果互不依赖，都保留在 `RecoveryResult` 里；展示时由 `primary_source`
//! 决定以哪一路为主。

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use unredact_ocr::OcrEngine;
use unredact_pdf::{extract_text_operands, LoadedPdf, PageKind};
use unredact_render::{PageRasterizer, Raster};

/// 日志中文字预览的最大字符数
const LOG_PREVIEW_CHARS: usize = 200;

/// 页面处理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageStatus {
    Ok,
    Failed { reason: String },
}

/// 展示时的主文字来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Raw,
    Ocr,
    None,
}

/// 原始文字非空时以它为准（精确），否则退回 OCR
pub fn primary_source(raw: &str, ocr: &str) -> TextSource {
    if !raw.trim().is_empty() {
        TextSource::Raw
    } else if !ocr.trim().is_empty() {
        TextSource::Ocr
    } else {
        TextSource::None
    }
}

/// 单页恢复结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryResult {
    pub document: String,
    pub page_index: usize,
    pub raw_extracted: String,
    pub ocr_extracted: String,
    pub ocr_confidence: Option<f32>,
    pub raw_error: Option<String>,
    pub ocr_error: Option<String>,
    pub page_kind: Option<PageKind>,
    pub status: PageStatus,
}

impl RecoveryResult {
    pub fn primary_source(&self) -> TextSource {
        primary_source(&self.raw_extracted, &self.ocr_extracted)
    }

    pub fn primary_text(&self) -> &str {
        match self.primary_source() {
            TextSource::Raw => &self.raw_extracted,
            TextSource::Ocr => &self.ocr_extracted,
            TextSource::None => "",
        }
    }
}

/// 是否在日志中输出完整文字（默认只输出预览）
fn should_log_full_text() -> bool {
    std::env::var("UNREDACT_LOG_FULL_TEXT")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn text_preview(text: &str) -> String {
    if should_log_full_text() || text.chars().count() <= LOG_PREVIEW_CHARS {
        text.to_string()
    } else {
        let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
        format!("{}...", preview)
    }
}

/// 文字恢复器
#[derive(Debug, Clone, Copy)]
pub struct TextRecoverer {
    /// OCR 渲染缩放比例（像素 / pt）
    ocr_scale: f32,
}

impl TextRecoverer {
    pub fn new(ocr_scale: f32) -> Self {
        Self { ocr_scale }
    }

    pub fn ocr_scale(&self) -> f32 {
        self.ocr_scale
    }

    /// 渲染该页后恢复文字；渲染失败只影响本页 OCR 与状态
    pub fn recover(
        &self,
        pdf: &LoadedPdf,
        page_index: usize,
        rasterizer: &dyn PageRasterizer,
        engine: Option<&mut (dyn OcrEngine + '_)>,
    ) -> RecoveryResult {
        match rasterizer.render(pdf, page_index, self.ocr_scale) {
            Ok(raster) => self.recover_page(pdf, page_index, Ok(&raster), engine),
            Err(e) => self.recover_page(pdf, page_index, Err(e.to_string()), engine),
        }
    }

    /// 用已有位图（或渲染失败原因）恢复单页文字，不会返回错误
    pub fn recover_page(
        &self,
        pdf: &LoadedPdf,
        page_index: usize,
        raster: std::result::Result<&Raster, String>,
        engine: Option<&mut (dyn OcrEngine + '_)>,
    ) -> RecoveryResult {
        let document = pdf.path().display().to_string();

        // 1. 原始文字
        let (raw_extracted, raw_error, page_kind) = match pdf.page_content(page_index) {
            Ok(content) => {
                let kind = unredact_pdf::classify_page(&content);
                match extract_text_operands(&content) {
                    Ok(text) => (text, None, Some(kind)),
                    Err(e) => (String::new(), Some(e.to_string()), Some(kind)),
                }
            }
            Err(e) => (String::new(), Some(e.to_string()), None),
        };

        // 2. OCR
        let (status, ocr_extracted, ocr_confidence, ocr_error) = match (raster, engine) {
            (Err(reason), _) => (
                PageStatus::Failed {
                    reason: reason.clone(),
                },
                String::new(),
                None,
                Some(format!("页面未渲染: {}", reason)),
            ),
            (Ok(_), None) => (
                PageStatus::Ok,
                String::new(),
                None,
                Some("OCR 引擎不可用".to_string()),
            ),
            (Ok(raster), Some(engine)) => {
                let img = DynamicImage::ImageRgba8(raster.image.clone());
                match engine.recognize_text(&img) {
                    Ok(text) => (PageStatus::Ok, text.text, text.confidence, None),
                    Err(e) => {
                        log::warn!("[Recover] 第 {} 页 OCR 失败: {}", page_index + 1, e);
                        (PageStatus::Ok, String::new(), None, Some(e.to_string()))
                    }
                }
            }
        };

        let result = RecoveryResult {
            document,
            page_index,
            raw_extracted,
            ocr_extracted,
            ocr_confidence,
            raw_error,
            ocr_error,
            page_kind,
            status,
        };

        log::info!(
            "[Recover] 第 {} 页: raw {} 字, ocr {} 字, 主来源 {:?}",
            page_index + 1,
            result.raw_extracted.chars().count(),
            result.ocr_extracted.chars().count(),
            result.primary_source()
        );
        log::debug!("[Recover] 主文字: {}", text_preview(result.primary_text()));

        result
    }
}
