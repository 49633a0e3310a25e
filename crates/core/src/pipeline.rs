//! 单文档处理流程
//!
//! 状态机：`Loaded → Rasterized → Edited | Recovered`，`Edited → Reencoded → Saved`。
//! 页面级失败只标记该页，其余页面继续处理。

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unredact_ocr::OcrEngine;
use unredact_pdf::LoadedPdf;
use unredact_render::{encode, PageRasterizer, Raster};

use crate::fill::FillSpec;
use crate::overlay::OverlayEditor;
use crate::recover::{RecoveryResult, TextRecoverer};
use crate::selection::RedactionBox;
use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Loaded,
    Rasterized,
    Edited,
    Recovered,
    Reencoded,
    Saved,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Loaded => "loaded",
            PipelineState::Rasterized => "rasterized",
            PipelineState::Edited => "edited",
            PipelineState::Recovered => "recovered",
            PipelineState::Reencoded => "reencoded",
            PipelineState::Saved => "saved",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单页状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState {
    Pending,
    Rasterized,
    Edited,
    Recovered,
    Reencoded,
    Failed { reason: String },
}

impl PageState {
    pub fn is_failed(&self) -> bool {
        matches!(self, PageState::Failed { .. })
    }
}

/// 一次编辑的记录，跨编辑轮次保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    /// 第几轮编辑（从 0 开始）
    pub cycle: u32,
    pub page_index: usize,
    pub boxes: Vec<RedactionBox>,
    pub fill: FillSpec,
}

/// 取消标记，只在页面或文档边界检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct DocumentPipeline {
    pdf: LoadedPdf,
    state: PipelineState,
    scale: f32,
    rasters: Vec<Option<Raster>>,
    page_states: Vec<PageState>,
    recoveries: Vec<RecoveryResult>,
    history: Vec<EditRecord>,
    cycle: u32,
    cancel: CancelFlag,
}

impl DocumentPipeline {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_pdf(LoadedPdf::open(path)?))
    }

    pub fn from_pdf(pdf: LoadedPdf) -> Self {
        let pages = pdf.page_count();
        Self {
            pdf,
            state: PipelineState::Loaded,
            scale: 1.0,
            rasters: vec![None; pages],
            page_states: vec![PageState::Pending; pages],
            recoveries: Vec::new(),
            history: Vec::new(),
            cycle: 0,
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn pdf(&self) -> &LoadedPdf {
        &self.pdf
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn page_count(&self) -> usize {
        self.pdf.page_count()
    }

    pub fn page_states(&self) -> &[PageState] {
        &self.page_states
    }

    pub fn raster(&self, page_index: usize) -> Option<&Raster> {
        self.rasters.get(page_index).and_then(Option::as_ref)
    }

    pub fn recoveries(&self) -> &[RecoveryResult] {
        &self.recoveries
    }

    pub fn into_recoveries(self) -> Vec<RecoveryResult> {
        self.recoveries
    }

    pub fn history(&self) -> &[EditRecord] {
        &self.history
    }

    fn expect_state(&self, allowed: &[PipelineState], to: PipelineState) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.state.name(),
                to: to.name(),
            })
        }
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("[Pipeline] {} 已取消", self.pdf.path().display());
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Loaded → Rasterized：渲染每一页，失败的页面标记为 Failed
    pub fn rasterize(&mut self, rasterizer: &dyn PageRasterizer, scale: f32) -> Result<()> {
        self.expect_state(&[PipelineState::Loaded], PipelineState::Rasterized)?;
        self.scale = scale;

        for index in 0..self.page_count() {
            self.check_cancel()?;
            match rasterizer.render(&self.pdf, index, scale) {
                Ok(raster) => {
                    self.rasters[index] = Some(raster);
                    self.page_states[index] = PageState::Rasterized;
                }
                Err(e) => {
                    log::warn!(
                        "[Pipeline] {} 第 {} 页渲染失败: {}",
                        self.pdf.path().display(),
                        index + 1,
                        e
                    );
                    self.page_states[index] = PageState::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }

        log::info!(
            "[Pipeline] {} 渲染完成（{} 页，backend {}，scale {}）",
            self.pdf.path().display(),
            self.page_count(),
            rasterizer.name(),
            scale
        );
        self.state = PipelineState::Rasterized;
        Ok(())
    }

    /// Rasterized / Edited → Edited：在对应页面的位图上绘制脱敏框
    ///
    /// 同一轮可以多次调用；指向已失败页面的框被跳过，页面保持 Failed。
    pub fn edit(&mut self, editor: &OverlayEditor, boxes: &[RedactionBox], fill: &FillSpec) -> Result<()> {
        self.expect_state(
            &[PipelineState::Rasterized, PipelineState::Edited],
            PipelineState::Edited,
        )?;

        let mut by_page: BTreeMap<usize, Vec<RedactionBox>> = BTreeMap::new();
        for b in boxes {
            if b.page_index >= self.page_count() {
                return Err(CoreError::InvalidRegion(format!(
                    "第 {} 页不存在（共 {} 页）",
                    b.page_index + 1,
                    self.page_count()
                )));
            }
            by_page.entry(b.page_index).or_default().push(*b);
        }

        for (index, page_boxes) in by_page {
            self.check_cancel()?;
            let Some(raster) = self.rasters[index].as_ref() else {
                log::warn!("[Pipeline] 第 {} 页未渲染，跳过编辑", index + 1);
                continue;
            };

            let edited = editor.apply(raster, &page_boxes, fill)?;
            self.rasters[index] = Some(edited);
            self.page_states[index] = PageState::Edited;
            self.history.push(EditRecord {
                cycle: self.cycle,
                page_index: index,
                boxes: page_boxes,
                fill: fill.clone(),
            });
        }

        self.state = PipelineState::Edited;
        Ok(())
    }

    /// Rasterized → Recovered：逐页恢复文字
    pub fn recover(
        &mut self,
        recoverer: &TextRecoverer,
        mut engine: Option<&mut (dyn OcrEngine + '_)>,
    ) -> Result<&[RecoveryResult]> {
        self.expect_state(&[PipelineState::Rasterized], PipelineState::Recovered)?;

        let mut results = Vec::with_capacity(self.page_count());
        for index in 0..self.page_count() {
            self.check_cancel()?;
            let raster = match (&self.rasters[index], &self.page_states[index]) {
                (Some(raster), _) => Ok(raster),
                (None, PageState::Failed { reason }) => Err(reason.clone()),
                (None, _) => Err("页面未渲染".to_string()),
            };
            let result = recoverer.recover_page(&self.pdf, index, raster, engine.as_deref_mut());
            if !self.page_states[index].is_failed() {
                self.page_states[index] = PageState::Recovered;
            }
            results.push(result);
        }

        self.recoveries = results;
        self.state = PipelineState::Recovered;
        Ok(&self.recoveries)
    }

    /// Edited → Reencoded：编辑过的页面替换为整页图片，其余页面不动
    pub fn reencode(&mut self) -> Result<()> {
        self.expect_state(&[PipelineState::Edited], PipelineState::Reencoded)?;

        for index in 0..self.page_count() {
            if self.page_states[index] != PageState::Edited {
                continue;
            }
            self.check_cancel()?;
            let Some(raster) = self.rasters[index].as_ref() else {
                continue;
            };

            let outcome = encode(raster)
                .map_err(CoreError::from)
                .and_then(|page| self.pdf.replace_page(index, &page).map_err(CoreError::from));
            match outcome {
                Ok(()) => self.page_states[index] = PageState::Reencoded,
                Err(e) => {
                    log::warn!("[Pipeline] 第 {} 页编码失败: {}", index + 1, e);
                    self.page_states[index] = PageState::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }

        self.state = PipelineState::Reencoded;
        Ok(())
    }

    /// Reencoded → Saved
    pub fn save(&mut self, dest: impl AsRef<Path>) -> Result<()> {
        self.expect_state(&[PipelineState::Reencoded], PipelineState::Saved)?;
        self.pdf.save(dest.as_ref())?;
        self.state = PipelineState::Saved;
        log::info!(
            "[Pipeline] 第 {} 轮编辑已保存到 {}",
            self.cycle + 1,
            dest.as_ref().display()
        );
        Ok(())
    }

    /// 以回写后的文档开始下一轮编辑，保留编辑历史
    pub fn next_cycle(mut self) -> Result<Self> {
        self.expect_state(
            &[PipelineState::Reencoded, PipelineState::Saved],
            PipelineState::Loaded,
        )?;

        let bytes = self.pdf.to_bytes()?;
        let pdf = LoadedPdf::from_bytes(self.pdf.path().to_path_buf(), bytes)?;
        let mut next = Self::from_pdf(pdf).with_cancel_flag(self.cancel.clone());
        next.history = std::mem::take(&mut self.history);
        next.cycle = self.cycle + 1;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::Color;
    use image::{Rgba, RgbaImage};
    use unredact_render::{ImagePageRasterizer, RenderError};

    /// 按页渲染纯白位图；`fail_page` 页返回错误
    struct WhiteRasterizer {
        fail_page: Option<usize>,
    }

    impl PageRasterizer for WhiteRasterizer {
        fn render(&self, pdf: &LoadedPdf, page_index: usize, scale: f32) -> unredact_render::Result<Raster> {
            if Some(page_index) == self.fail_page {
                return Err(RenderError::Backend("boom".to_string()));
            }
            let mb = pdf.media_box(page_index)?;
            let w = (mb.width() * scale).round() as u32;
            let h = (mb.height() * scale).round() as u32;
            Ok(Raster::new(
                RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
                scale,
                page_index,
            ))
        }

        fn name(&self) -> &'static str {
            "white"
        }
    }

    fn rb(page_index: usize) -> RedactionBox {
        RedactionBox {
            page_index,
            x: 1,
            y: 1,
            width: 5,
            height: 5,
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let pdf = LoadedPdf::blank(1, 20.0, 20.0).unwrap();
        let mut pipeline = DocumentPipeline::from_pdf(pdf);
        assert!(matches!(
            pipeline.reencode(),
            Err(CoreError::InvalidTransition { from: "loaded", to: "reencoded" })
        ));
        assert!(pipeline.edit(&OverlayEditor::new(), &[], &FillSpec::solid(Color::BLACK)).is_err());

        pipeline.rasterize(&WhiteRasterizer { fail_page: None }, 1.0).unwrap();
        assert!(pipeline.save("/nonexistent/out.pdf").is_err());
        assert!(pipeline.rasterize(&WhiteRasterizer { fail_page: None }, 1.0).is_err());
    }

    #[test]
    fn test_failed_page_does_not_abort_document() {
        let pdf = LoadedPdf::blank(3, 20.0, 20.0).unwrap();
        let mut pipeline = DocumentPipeline::from_pdf(pdf);
        pipeline.rasterize(&WhiteRasterizer { fail_page: Some(1) }, 1.0).unwrap();

        assert_eq!(pipeline.page_states()[0], PageState::Rasterized);
        assert!(pipeline.page_states()[1].is_failed());
        assert_eq!(pipeline.page_states()[2], PageState::Rasterized);

        pipeline
            .edit(&OverlayEditor::new(), &[rb(0), rb(1), rb(2)], &FillSpec::solid(Color::BLACK))
            .unwrap();
        assert_eq!(pipeline.page_states()[0], PageState::Edited);
        assert!(pipeline.page_states()[1].is_failed());
        assert_eq!(pipeline.history().len(), 2);
    }

    #[test]
    fn test_only_edited_pages_are_reencoded() {
        let pdf = LoadedPdf::blank(2, 20.0, 10.0).unwrap();
        let mut pipeline = DocumentPipeline::from_pdf(pdf);
        pipeline.rasterize(&WhiteRasterizer { fail_page: None }, 2.0).unwrap();
        pipeline
            .edit(&OverlayEditor::new(), &[rb(1)], &FillSpec::solid(Color::BLACK))
            .unwrap();
        pipeline.reencode().unwrap();

        assert_eq!(pipeline.page_states()[0], PageState::Rasterized);
        assert_eq!(pipeline.page_states()[1], PageState::Reencoded);

        let next = pipeline.next_cycle().unwrap();
        assert_eq!(next.state(), PipelineState::Loaded);
        assert_eq!(next.cycle(), 1);
        assert_eq!(next.history().len(), 1);

        let first = next.pdf().media_box(0).unwrap();
        let second = next.pdf().media_box(1).unwrap();
        assert_eq!((first.width(), first.height()), (20.0, 10.0));
        assert_eq!((second.width(), second.height()), (40.0, 20.0));

        // 回写的页面可由纯图片渲染器读取，框的位置是黑色
        let raster = ImagePageRasterizer.render(next.pdf(), 1, 1.0).unwrap();
        assert_eq!(raster.image.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(raster.image.get_pixel(30, 15), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_edit_rejects_box_on_missing_page() {
        let pdf = LoadedPdf::blank(1, 20.0, 20.0).unwrap();
        let mut pipeline = DocumentPipeline::from_pdf(pdf);
        pipeline.rasterize(&WhiteRasterizer { fail_page: None }, 1.0).unwrap();
        let result = pipeline.edit(&OverlayEditor::new(), &[rb(4)], &FillSpec::solid(Color::BLACK));
        assert!(matches!(result, Err(CoreError::InvalidRegion(_))));
    }

    #[test]
    fn test_cancel_checked_at_page_boundary() {
        let pdf = LoadedPdf::blank(2, 20.0, 20.0).unwrap();
        let cancel = CancelFlag::new();
        let mut pipeline = DocumentPipeline::from_pdf(pdf).with_cancel_flag(cancel.clone());
        cancel.cancel();
        assert!(matches!(
            pipeline.rasterize(&WhiteRasterizer { fail_page: None }, 1.0),
            Err(CoreError::Cancelled)
        ));
    }

    #[test]
    fn test_recover_keeps_failed_pages() {
        let pdf = LoadedPdf::blank(2, 20.0, 20.0).unwrap();
        let mut pipeline = DocumentPipeline::from_pdf(pdf);
        pipeline.rasterize(&WhiteRasterizer { fail_page: Some(0) }, 1.0).unwrap();
        let results = pipeline.recover(&TextRecoverer::new(1.0), None).unwrap();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].status, crate::PageStatus::Failed { .. }));
        assert_eq!(results[1].status, crate::PageStatus::Ok);
        assert_eq!(pipeline.state(), PipelineState::Recovered);
    }
}
