//! 在页面位图上覆盖脱敏框

use ab_glyph::{FontArc, PxScale};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use unredact_render::Raster;

use crate::fill::FillSpec;
use crate::selection::RedactionBox;
use crate::{CoreError, Result};

/// 覆盖编辑器
///
/// 纯色填充不需要字体；文字填充需要先通过 `with_font` 提供字体。
#[derive(Clone, Default)]
pub struct OverlayEditor {
    font: Option<FontArc>,
}

impl OverlayEditor {
    pub fn new() -> Self {
        Self { font: None }
    }

    pub fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 按列表顺序绘制属于该页的框，返回新位图，输入不变
    ///
    /// 文字从框左上角开始、左对齐，像素字号为 `font_size * raster.scale`；
    /// 超出框的部分不裁剪。
    pub fn apply(&self, raster: &Raster, boxes: &[RedactionBox], fill: &FillSpec) -> Result<Raster> {
        let mut output = raster.clone();
        let page_boxes: Vec<&RedactionBox> = boxes
            .iter()
            .filter(|b| b.page_index == raster.page_index)
            .collect();

        if page_boxes.is_empty() {
            return Ok(output);
        }

        let font = match fill {
            FillSpec::Text { font_size, .. } => {
                if !(font_size.is_finite() && *font_size > 0.0) {
                    return Err(CoreError::Font(format!("字号无效: {}", font_size)));
                }
                Some(self.font.as_ref().ok_or_else(|| {
                    CoreError::Font("文字填充需要字体".to_string())
                })?)
            }
            FillSpec::Solid { .. } => None,
        };

        let (img_w, img_h) = output.image.dimensions();
        let mut painted = 0usize;
        for b in &page_boxes {
            // 框在选择时已校验；位图尺寸变化时只画仍在范围内的部分
            let w = b.width.min(img_w.saturating_sub(b.x));
            let h = b.height.min(img_h.saturating_sub(b.y));
            if w == 0 || h == 0 {
                log::warn!(
                    "[Overlay] 框 ({}, {}, {}x{}) 不在第 {} 页位图内，跳过",
                    b.x,
                    b.y,
                    b.width,
                    b.height,
                    raster.page_index + 1
                );
                continue;
            }
            let rect = Rect::at(b.x as i32, b.y as i32).of_size(w, h);

            match fill {
                FillSpec::Solid { color } => {
                    draw_filled_rect_mut(&mut output.image, rect, color.rgba());
                }
                FillSpec::Text {
                    text,
                    font_size,
                    color,
                    background,
                } => {
                    draw_filled_rect_mut(&mut output.image, rect, background.rgba());
                    if let Some(font) = font {
                        let scale = PxScale::from(font_size * raster.scale);
                        draw_text_mut(
                            &mut output.image,
                            color.rgba(),
                            b.x as i32,
                            b.y as i32,
                            scale,
                            font,
                            text,
                        );
                    }
                }
            }
            painted += 1;
        }

        log::debug!(
            "[Overlay] 第 {} 页绘制 {} 个框（跳过 {} 个）",
            raster.page_index + 1,
            painted,
            page_boxes.len() - painted
        );
        Ok(output)
    }
}
